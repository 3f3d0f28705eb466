//! Dynamic client for the scripting API of a running Xepr process.
//!
//! The peer publishes its function catalogue at connect time; every entry
//! becomes a callable member of a [`session::Session`]. Datasets,
//! experiments and parameters are wrapped in proxies on top.
//!
//! # Crate Structure
//!
//! - [`transport`]: native library binding, peer discovery and selection
//! - [`codec`]: tagged operand-stack values and their wire encoding
//! - [`catalog`]: catalogue parsing, documentation scan, member registry
//! - [`session`]: sessions, invocation and proxies (behind `session` feature)
//!
//! ```no_run
//! use xeprapi::session::{Session, SessionConfig};
//!
//! let xepr = Session::connect(SessionConfig::default())?;
//! let mut dset = xepr.dataset().slot("primary".parse()?).build()?;
//! println!("{:?}", dset.shape()?);
//! # Ok::<(), xeprapi::session::XeprError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use xeprapi_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use xeprapi_codec::*;
}

/// Re-export catalogue types.
pub mod catalog {
    pub use xeprapi_catalog::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use xeprapi_session::*;
}
