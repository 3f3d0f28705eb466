//! Runtime catalogue of what the peer offers.
//!
//! The peer describes its scripting surface when a session opens. This
//! crate turns the raw tables into typed entries, scrapes prototype
//! documentation, and synthesizes the member table every call goes
//! through.

pub mod config;
pub mod docs;
pub mod entry;
pub mod error;
pub mod registry;

pub use config::CatalogConfig;
pub use docs::{member_doc, scan_prototypes, DOC_SUBDIR};
pub use entry::{parse_commands, parse_functions, Arity, CommandEntry, FunctionEntry};
pub use error::{CatalogueError, Result};
pub use registry::{is_constant_name, Member, MemberRegistry};
