//! Native transport layer for the Xepr API.
//!
//! Provides the raw primitives of the shared transport library
//! (`libxeprapi.so`) behind the [`XeprLibrary`] trait:
//! - catalogue retrieval (functions, commands, documentation directory)
//! - operand-stack push/pop, call by ordinal, mutable-buffer retrieval
//! - discovery of peers waiting for a client, and peer selection
//!
//! This is the lowest layer of xeprapi. Everything else builds on top of
//! an `Arc<dyn XeprLibrary>` provided here.

pub mod discovery;
pub mod error;
pub mod library;
pub mod select;

#[cfg(unix)]
pub mod native;

pub use discovery::{
    find_instances, find_instances_in, instances_from_dirs, unclaimed_peer_dirs, Instance,
};
pub use error::{Result, TransportError};
pub use library::{CommandTable, FunctionTable, PoppedValue, SocketTokens, XeprLibrary, SUCCESS};
pub use select::{choose_instance, AmbiguityPolicy, InstanceSelector};

#[cfg(unix)]
pub use native::{library_file_name, resolve_library_path, NativeLibrary, LIB_DIR_ENV};
