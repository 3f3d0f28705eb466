use std::collections::HashMap;

use tracing::debug;
use xeprapi_codec::StackValue;

use crate::config::CatalogConfig;
use crate::docs::member_doc;
use crate::entry::{Arity, CommandEntry, FunctionEntry};

/// An invocable bound to one catalogue entry.
#[derive(Debug, Clone)]
pub struct Member {
    /// Name the member is reachable under; `_<name>_` when aliased.
    pub binding: String,
    pub entry: FunctionEntry,
    pub doc: String,
    /// Value cached at open time for folded constants.
    pub constant: Option<StackValue>,
}

impl Member {
    pub fn is_aliased(&self) -> bool {
        self.binding != self.entry.name
    }
}

/// True for names that read as constants: at least one cased character
/// and no lower-case one.
pub fn is_constant_name(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}

/// Name-indexed table of synthesized members plus the command namespace.
///
/// Immutable once built.
#[derive(Debug, Default)]
pub struct MemberRegistry {
    members: Vec<Member>,
    by_binding: HashMap<String, usize>,
    commands: Vec<CommandEntry>,
    by_command: HashMap<String, usize>,
}

impl MemberRegistry {
    /// Synthesize one member per function entry and index the commands.
    ///
    /// A name that collides with `reserved` or with an earlier member is
    /// bound as `_<name>_`. When folding is enabled, `eval` is called once
    /// for every constant-looking entry and its result is cached.
    pub fn build<E, F>(
        functions: Vec<FunctionEntry>,
        commands: Vec<CommandEntry>,
        docs: &HashMap<String, String>,
        reserved: &[&str],
        config: CatalogConfig,
        mut eval: F,
    ) -> std::result::Result<Self, E>
    where
        F: FnMut(&FunctionEntry) -> std::result::Result<StackValue, E>,
    {
        let mut registry = Self::default();

        for entry in functions {
            let taken = reserved.contains(&entry.name.as_str())
                || registry.by_binding.contains_key(&entry.name);
            let binding = if taken {
                debug!(name = %entry.name, "catalogue name collides; aliasing");
                format!("_{}_", entry.name)
            } else {
                entry.name.clone()
            };

            let folds = config.constant_constants
                && entry.arity == Arity::Fixed(0)
                && entry.returns
                && is_constant_name(&binding);
            let constant = if folds { Some(eval(&entry)?) } else { None };

            let doc = member_doc(docs.get(&entry.name).map(String::as_str));
            registry
                .by_binding
                .insert(binding.clone(), registry.members.len());
            registry.members.push(Member {
                binding,
                entry,
                doc,
                constant,
            });
        }

        for command in commands {
            registry
                .by_command
                .insert(command.name.clone(), registry.commands.len());
            registry.commands.push(command);
        }

        debug!(
            members = registry.members.len(),
            commands = registry.commands.len(),
            "member registry built"
        );
        Ok(registry)
    }

    /// Member bound under `binding`.
    pub fn get(&self, binding: &str) -> Option<&Member> {
        self.by_binding.get(binding).map(|idx| &self.members[*idx])
    }

    pub fn contains(&self, binding: &str) -> bool {
        self.by_binding.contains_key(binding)
    }

    /// Members in catalogue order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.by_command.get(name).map(|idx| &self.commands[*idx])
    }

    /// Commands in catalogue order.
    pub fn commands(&self) -> &[CommandEntry] {
        &self.commands
    }
}
