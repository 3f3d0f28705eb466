use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use xeprapi_session::{Session, SessionConfig};
use xeprapi_transport::{AmbiguityPolicy, XeprLibrary};

use crate::exit::{session_error, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod catalog;
pub mod instances;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List Xepr processes waiting for a client.
    Instances,
    /// List the functions the peer publishes.
    Functions(FunctionsArgs),
    /// List the peer's commands.
    Commands(CommandsArgs),
    /// Call one function of the peer.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Instances => instances::run(connect, format),
        Command::Functions(args) => catalog::functions(args, connect, format),
        Command::Commands(args) => catalog::commands(args, connect, format),
        Command::Call(args) => call::run(args, connect, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to find the transport library and which peer to bind.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Directory holding the transport library.
    #[arg(long, value_name = "DIR", env = "XEPRAPI_LIB_DIR", global = true)]
    pub lib_dir: Option<PathBuf>,
    /// PID of the Xepr process to bind.
    #[arg(long, global = true)]
    pub pid: Option<u32>,
    /// Take the first peer when several are reachable.
    #[arg(long, global = true)]
    pub first: bool,
    /// Evaluate constant-looking functions on every call instead of once.
    #[arg(long, global = true)]
    pub no_fold: bool,
}

impl ConnectArgs {
    pub fn config(&self) -> SessionConfig {
        let mut config = SessionConfig::default()
            .with_constant_constants(!self.no_fold)
            .with_verbose(true);
        if let Some(dir) = &self.lib_dir {
            config = config.with_library_dir(dir);
        }
        if let Some(pid) = self.pid {
            config = config.with_pid(pid);
        }
        if self.first {
            config = config.with_ambiguity_policy(AmbiguityPolicy::FirstInstance);
        }
        config
    }
}

#[cfg(unix)]
pub fn load_library(connect: &ConnectArgs) -> CliResult<Arc<dyn XeprLibrary>> {
    let library = xeprapi_transport::NativeLibrary::open(connect.lib_dir.as_deref())
        .map_err(|err| crate::exit::transport_error("load failed", err))?;
    tracing::debug!(path = %library.path().display(), "transport library loaded");
    Ok(Arc::new(library))
}

#[cfg(not(unix))]
pub fn load_library(_connect: &ConnectArgs) -> CliResult<Arc<dyn XeprLibrary>> {
    Err(crate::exit::CliError::new(
        crate::exit::CONNECTION_ERROR,
        "the Xepr transport library is only available on Unix",
    ))
}

pub fn connect(connect: &ConnectArgs) -> CliResult<Session> {
    let library = load_library(connect)?;
    Session::with_library(library, connect.config(), None)
        .map_err(|err| session_error("connect failed", err))
}

#[derive(Args, Debug)]
pub struct FunctionsArgs {
    /// Only list names containing this text (case-insensitive).
    #[arg(long)]
    pub filter: Option<String>,
    /// Include full documentation instead of the first line.
    #[arg(long)]
    pub docs: bool,
}

#[derive(Args, Debug)]
pub struct CommandsArgs {
    /// Only list names containing this text (case-insensitive).
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Function name; aliased names are written `_name_`.
    pub name: String,
    /// Arguments, classified as bool, int, float, or string.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
    /// Treat every argument as a string.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Case-insensitive substring filter; no pattern keeps everything.
pub fn keep(name: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| name.to_lowercase().contains(&f.to_lowercase()))
}
