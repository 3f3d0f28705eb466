use serde::Serialize;
use xeprapi_codec::StackType;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum XeprError {
    /// Transport-level error (library loading, peer discovery).
    #[error("transport error: {0}")]
    Transport(#[from] xeprapi_transport::TransportError),

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] xeprapi_codec::CodecError),

    /// The peer's catalogue could not be built.
    #[error("catalogue error: {0}")]
    Catalogue(#[from] xeprapi_catalog::CatalogueError),

    /// The peer does not have the API enabled.
    #[error("could not open API")]
    ApiInactive,

    /// The session has been closed.
    #[error("API is closed")]
    NotOpen,

    /// The peer did not acknowledge the release request.
    #[error("could not close API (status {0})")]
    CloseRejected(i32),

    #[error("no such member '{0}'")]
    NoSuchMember(String),

    #[error("no such command '{0}'")]
    NoSuchCommand(String),

    #[error("{name} takes {expected} arguments, {got} given")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The peer reported a nonzero status for a call.
    #[error("error processing function call {name} (status {status})")]
    Call { name: String, status: i32 },

    #[error("{0} returned no value")]
    NoReturnValue(String),

    #[error("{name} returned a {got} value, expected {expected}")]
    UnexpectedReturn {
        name: String,
        expected: &'static str,
        got: StackType,
    },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("no such dataset '{0}'")]
    NoSuchDataset(String),

    #[error("dimension error: {0}")]
    Dimension(String),

    #[error("experiment error: {0}")]
    Experiment(String),

    #[error("parameter error: {0}")]
    Parameter(String),

    #[error("parameter name '{query}' is ambiguous in experiment '{experiment}': {}", matches.join(", "))]
    AmbiguousParameter {
        query: String,
        experiment: String,
        matches: Vec<String>,
    },

    #[error("index error: {0}")]
    Index(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of [`XeprError`] for callers and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Catalogue,
    Invocation,
    Dataset,
    Dimension,
    Experiment,
    Parameter,
    Index,
    Value,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Catalogue => "catalogue",
            ErrorKind::Invocation => "invocation",
            ErrorKind::Dataset => "dataset",
            ErrorKind::Dimension => "dimension",
            ErrorKind::Experiment => "experiment",
            ErrorKind::Parameter => "parameter",
            ErrorKind::Index => "index",
            ErrorKind::Value => "value",
        }
    }
}

impl XeprError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            XeprError::Transport(_)
            | XeprError::ApiInactive
            | XeprError::NotOpen
            | XeprError::CloseRejected(_) => ErrorKind::Connection,
            XeprError::Catalogue(_) => ErrorKind::Catalogue,
            XeprError::NoSuchMember(_)
            | XeprError::NoSuchCommand(_)
            | XeprError::Arity { .. }
            | XeprError::Call { .. }
            | XeprError::NoReturnValue(_)
            | XeprError::UnexpectedReturn { .. } => ErrorKind::Invocation,
            XeprError::Dataset(_) => ErrorKind::Dataset,
            XeprError::Dimension(_) => ErrorKind::Dimension,
            XeprError::Experiment(_) => ErrorKind::Experiment,
            XeprError::Parameter(_) | XeprError::AmbiguousParameter { .. } => {
                ErrorKind::Parameter
            }
            XeprError::Index(_) => ErrorKind::Index,
            XeprError::Codec(_) | XeprError::NoSuchDataset(_) | XeprError::InvalidArgument(_) => {
                ErrorKind::Value
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, XeprError>;
