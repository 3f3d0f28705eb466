use std::fmt;

use xeprapi_session::{ErrorKind, XeprError};
use xeprapi_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CONNECTION_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for an error class.
pub fn code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Connection => CONNECTION_ERROR,
        ErrorKind::Catalogue => DATA_INVALID,
        ErrorKind::Value | ErrorKind::Index | ErrorKind::Dimension => USAGE,
        ErrorKind::Invocation
        | ErrorKind::Dataset
        | ErrorKind::Experiment
        | ErrorKind::Parameter => FAILURE,
    }
}

pub fn session_error(context: &str, err: XeprError) -> CliError {
    CliError::new(code_for(err.kind()), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(CONNECTION_ERROR, format!("{context}: {err}"))
}
