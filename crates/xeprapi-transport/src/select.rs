use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::discovery::Instance;
use crate::error::{Result, TransportError};

/// Interactive collaborator consulted when several peers are reachable.
#[cfg_attr(test, mockall::automock)]
pub trait InstanceSelector {
    /// Index into `instances` of the chosen peer, or `None` for no choice.
    fn select(&self, instances: &[Instance]) -> Option<usize>;
}

/// What to do when several peers are reachable and nobody picked one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Refuse to connect.
    #[default]
    Fail,
    /// Connect to the first peer in discovery order.
    FirstInstance,
}

/// Pick the peer to bind to.
///
/// An explicit `requested` PID must be among `available`. Without one, a
/// single peer is chosen automatically; several peers go to `selector`,
/// and `policy` decides when it is absent or makes no choice.
pub fn choose_instance(
    available: &[Instance],
    requested: Option<u32>,
    selector: Option<&dyn InstanceSelector>,
    policy: AmbiguityPolicy,
) -> Result<u32> {
    if available.is_empty() {
        return Err(TransportError::NoPeer);
    }

    if let Some(pid) = requested {
        if available.iter().any(|i| i.pid == pid) {
            return Ok(pid);
        }
        return Err(TransportError::NoSuchPeer(pid));
    }

    if let [only] = available {
        debug!(pid = only.pid, "single peer reachable");
        return Ok(only.pid);
    }

    let picked = selector
        .and_then(|s| s.select(available))
        .and_then(|idx| available.get(idx));
    if let Some(instance) = picked {
        info!(pid = instance.pid, "peer chosen by selector");
        return Ok(instance.pid);
    }

    match policy {
        AmbiguityPolicy::Fail => Err(TransportError::AmbiguousPeer {
            count: available.len(),
        }),
        AmbiguityPolicy::FirstInstance => {
            let first = &available[0];
            info!(pid = first.pid, "several peers reachable; using the first");
            Ok(first.pid)
        }
    }
}
