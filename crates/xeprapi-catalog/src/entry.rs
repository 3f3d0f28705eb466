use std::fmt;

use serde::Serialize;
use tracing::debug;
use xeprapi_codec::decode_latin1;
use xeprapi_transport::{CommandTable, FunctionTable};

use crate::error::{CatalogueError, Result};

/// Declared argument count of a catalogue function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    Fixed(usize),
    /// Any number of arguments; the count travels as a final `int`.
    Variadic,
}

impl Arity {
    /// Decode the signed arity byte; negative means variadic.
    pub fn from_raw(raw: i8) -> Self {
        match usize::try_from(raw) {
            Ok(n) => Arity::Fixed(n),
            Err(_) => Arity::Variadic,
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => n == count,
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => f.write_str("..."),
        }
    }
}

/// One callable operation of the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionEntry {
    /// Position in the catalogue; the peer calls by this ordinal.
    pub ordinal: usize,
    pub name: String,
    pub arity: Arity,
    pub returns: bool,
}

/// One named command of the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
    pub name: String,
    pub description: String,
}

/// Parse the function catalogue.
pub fn parse_functions(table: &FunctionTable) -> Result<Vec<FunctionEntry>> {
    let count = usize::try_from(table.count).map_err(|_| CatalogueError::Functions(table.count))?;
    if table.arities.len() < count || table.returns.len() < count {
        return Err(CatalogueError::Malformed {
            table: "function",
            detail: format!(
                "{count} entries advertised, {} arities and {} return flags supplied",
                table.arities.len(),
                table.returns.len()
            ),
        });
    }

    let names = decode_latin1(&table.names);
    let listed = names.lines().count();
    if listed < count {
        return Err(CatalogueError::Malformed {
            table: "function",
            detail: format!("{count} entries advertised, {listed} names supplied"),
        });
    }
    let entries: Vec<FunctionEntry> = names
        .lines()
        .take(count)
        .enumerate()
        .map(|(ordinal, name)| FunctionEntry {
            ordinal,
            name: name.to_string(),
            arity: Arity::from_raw(table.arities[ordinal]),
            returns: table.returns[ordinal],
        })
        .collect();
    debug!(count = entries.len(), "parsed function catalogue");
    Ok(entries)
}

/// Parse the command catalogue, dropping names that do not start with a letter.
pub fn parse_commands(table: &CommandTable) -> Result<Vec<CommandEntry>> {
    if table.count < 0 {
        return Err(CatalogueError::Commands(table.count));
    }

    let names = decode_latin1(&table.names);
    let descriptions = decode_latin1(&table.descriptions);
    let entries: Vec<CommandEntry> = names
        .lines()
        .zip(descriptions.lines())
        .filter(|(name, _)| name.chars().next().is_some_and(char::is_alphabetic))
        .map(|(name, description)| CommandEntry {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();
    debug!(count = entries.len(), "parsed command catalogue");
    Ok(entries)
}
