use std::sync::Arc;

use xeprapi_catalog::{CommandEntry, MemberRegistry};
use xeprapi_codec::StackValue;

use crate::error::{Result, XeprError};
use crate::session::Session;

/// The peer's command namespace, as exposed under `XeprCmds`.
///
/// Commands are looked up by name and run through the session's dispatch
/// function; they never return a value.
pub struct Commands<'s> {
    session: &'s Session,
    registry: Arc<MemberRegistry>,
}

impl<'s> Commands<'s> {
    /// Command names in catalogue order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.commands().iter().map(|c| c.name.as_str())
    }

    pub fn entries(&self) -> &[CommandEntry] {
        self.registry.commands()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.command(name).is_some()
    }

    /// The catalogue description of `name`.
    pub fn description(&self, name: &str) -> Result<&str> {
        self.registry
            .command(name)
            .map(|c| c.description.as_str())
            .ok_or_else(|| XeprError::NoSuchCommand(name.to_string()))
    }

    pub fn run(&self, name: &str, args: &[StackValue]) -> Result<()> {
        if !self.contains(name) {
            return Err(XeprError::NoSuchCommand(name.to_string()));
        }
        self.session.exec_cmd(name, args)
    }
}

impl Session {
    /// The command namespace of the open session.
    pub fn commands(&self) -> Result<Commands<'_>> {
        Ok(Commands {
            session: self,
            registry: self.registry()?,
        })
    }
}
