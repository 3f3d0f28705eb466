//! Session layer for the Xepr API.
//!
//! Opens the API of one running Xepr process, synthesizes a member for
//! every function in its catalogue, and runs calls through the shared
//! operand stack. Dataset, experiment, and parameter proxies build on top.

pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
mod invoke;
pub mod lock;
pub mod parameter;
pub mod session;

#[cfg(test)]
mod testing;

pub use commands::Commands;
pub use config::{pid_from_env, SessionConfig, PID_ENV};
pub use dataset::{Axis, AxisData, Dataset, DatasetBuilder, Slot, UpdateOptions};
pub use error::{ErrorKind, Result, XeprError};
pub use experiment::{Experiment, ExperimentBuilder, CURRENT_VIEWPORT};
pub use lock::TransportLock;
pub use parameter::{EnumMode, ParamType, Parameter};
pub use session::{Session, COMMAND_DISPATCH, RESERVED_MEMBERS, TEXT_MEMBERS};
