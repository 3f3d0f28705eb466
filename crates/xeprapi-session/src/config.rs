use std::path::PathBuf;

use xeprapi_catalog::CatalogConfig;
use xeprapi_transport::AmbiguityPolicy;

use crate::error::{Result, XeprError};

/// Environment variable selecting a peer by PID, bypassing discovery.
pub const PID_ENV: &str = "XEPR_PID";

/// Controls how a session finds, binds to, and describes its peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory holding the transport library.
    pub library_dir: Option<PathBuf>,
    /// Peer to bind to; must be among the discovered peers.
    pub pid: Option<u32>,
    /// Fold constant-looking catalogue entries at open time.
    pub constant_constants: bool,
    /// Log lifecycle events at info level instead of debug.
    pub verbose: bool,
    /// Decides between several reachable peers when nobody picked one.
    pub ambiguity: AmbiguityPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            pid: None,
            constant_constants: true,
            verbose: false,
            ambiguity: AmbiguityPolicy::Fail,
        }
    }
}

impl SessionConfig {
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_constant_constants(mut self, enabled: bool) -> Self {
        self.constant_constants = enabled;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub(crate) fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            constant_constants: self.constant_constants,
        }
    }
}

/// PID from `XEPR_PID`, if set.
pub fn pid_from_env() -> Result<Option<u32>> {
    match std::env::var(PID_ENV) {
        Ok(raw) => parse_pid(&raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_pid(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid != 0)
        .ok_or_else(|| XeprError::InvalidArgument(format!("{PID_ENV}={raw:?} is not a PID")))
}
