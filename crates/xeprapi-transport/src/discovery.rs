use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::library::{SocketTokens, XeprLibrary};

/// Kernel table of open local sockets.
pub const SOCKET_TABLE: &str = "/proc/net/unix";

/// A peer process waiting for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub pid: u32,
    pub title: String,
}

/// Peer directories that advertise a listening socket and have no client yet.
///
/// `table` is the text of the kernel socket table; the socket path is the
/// last whitespace separated column of each line.
pub fn unclaimed_peer_dirs(table: &str, tokens: &SocketTokens) -> Vec<PathBuf> {
    let sockets: Vec<&Path> = table
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(Path::new)
        .filter(|path| path.starts_with(&tokens.sock_dir))
        .collect();

    let mut dirs: Vec<PathBuf> = Vec::new();
    for socket in &sockets {
        let is_server = socket
            .to_str()
            .is_some_and(|s| s.ends_with(&tokens.server_suffix));
        if !is_server {
            continue;
        }
        let Some(dir) = socket.parent() else {
            continue;
        };
        let client = dir.join(&tokens.client_suffix);
        if sockets.contains(&client.as_path()) {
            debug!(?dir, "peer already has a client");
            continue;
        }
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
    }
    dirs
}

/// Turn peer directories into instances, reading each title file.
///
/// Directories whose name is not a PID or whose title cannot be read are
/// skipped with a warning.
pub fn instances_from_dirs(dirs: &[PathBuf], title_file: &str) -> Vec<Instance> {
    let mut instances = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let pid = dir
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<u32>().ok());
        let Some(pid) = pid else {
            warn!(?dir, "peer directory name is not a PID; skipping");
            continue;
        };
        match std::fs::read_to_string(dir.join(title_file)) {
            Ok(title) => instances.push(Instance { pid, title }),
            Err(e) => warn!(?dir, error = %e, "failed to read peer title; skipping"),
        }
    }
    instances
}

/// Enumerate peers waiting for a client.
pub fn find_instances(library: &dyn XeprLibrary) -> Result<Vec<Instance>> {
    find_instances_in(library, Path::new(SOCKET_TABLE))
}

/// Enumerate peers using the socket table at `table_path`.
pub fn find_instances_in(library: &dyn XeprLibrary, table_path: &Path) -> Result<Vec<Instance>> {
    let tokens = library.socket_tokens();
    let table = std::fs::read_to_string(table_path)?;
    let dirs = unclaimed_peer_dirs(&table, &tokens);
    let instances = instances_from_dirs(&dirs, &tokens.title_file);
    debug!(count = instances.len(), "discovered peers");
    Ok(instances)
}
