use std::path::PathBuf;

/// Errors that can occur while loading the transport library or locating a peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The shared library file does not exist.
    #[error("transport library not found at {path}")]
    LibraryNotFound { path: PathBuf },

    /// Copying the library to its private location failed.
    #[error("failed to stage transport library {path}: {source}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The dynamic loader rejected the library.
    #[error("failed to load transport library {path}: {source}")]
    Load {
        path: PathBuf,
        source: libloading::Error,
    },

    /// A required symbol is missing from the library.
    #[error("transport library has no symbol {symbol}: {source}")]
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
    },

    /// An I/O error occurred during discovery.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No peer is waiting for a client.
    #[error("could not connect to any Xepr instance")]
    NoPeer,

    /// The requested peer is not among the reachable ones.
    #[error("no such Xepr instance waiting for connections: PID {0}")]
    NoSuchPeer(u32),

    /// Several peers are reachable and none was chosen.
    #[error("{count} Xepr instances are reachable and none was selected")]
    AmbiguousPeer { count: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
