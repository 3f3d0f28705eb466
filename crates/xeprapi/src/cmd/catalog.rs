use serde::Serialize;
use xeprapi_catalog::Member;
use xeprapi_codec::StackValue;

use crate::cmd::{connect, keep, CommandsArgs, ConnectArgs, FunctionsArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_listing, summary, Listing, OutputFormat};

#[derive(Serialize)]
struct FunctionRow {
    name: String,
    ordinal: usize,
    arity: String,
    returns: bool,
    constant: Option<StackValue>,
    doc: String,
}

impl FunctionRow {
    fn from_member(member: &Member, full_doc: bool) -> Self {
        Self {
            name: member.binding.clone(),
            ordinal: member.entry.ordinal,
            arity: member.entry.arity.to_string(),
            returns: member.entry.returns,
            constant: member.constant.clone(),
            doc: if full_doc {
                member.doc.clone()
            } else {
                summary(&member.doc)
            },
        }
    }
}

#[derive(Serialize)]
struct FunctionsOutput {
    pid: u32,
    functions: Vec<FunctionRow>,
}

impl Listing for FunctionsOutput {
    fn headers(&self) -> Vec<&'static str> {
        vec!["NAME", "ARGS", "RETURNS", "VALUE", "DOC"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.functions
            .iter()
            .map(|f| {
                vec![
                    f.name.clone(),
                    f.arity.clone(),
                    f.returns.to_string(),
                    f.constant
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    f.doc.clone(),
                ]
            })
            .collect()
    }
}

#[derive(Serialize)]
struct CommandRow {
    name: String,
    description: String,
}

#[derive(Serialize)]
struct CommandsOutput {
    pid: u32,
    commands: Vec<CommandRow>,
}

impl Listing for CommandsOutput {
    fn headers(&self) -> Vec<&'static str> {
        vec!["NAME", "DESCRIPTION"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.commands
            .iter()
            .map(|c| vec![c.name.clone(), c.description.clone()])
            .collect()
    }
}

pub fn functions(
    args: FunctionsArgs,
    connect_args: &ConnectArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let session = connect(connect_args)?;
    let registry = session
        .registry()
        .map_err(|err| session_error("catalogue unavailable", err))?;
    let functions = registry
        .members()
        .iter()
        .filter(|m| keep(&m.binding, args.filter.as_deref()))
        .map(|m| FunctionRow::from_member(m, args.docs))
        .collect();

    print_listing(
        &FunctionsOutput {
            pid: session.pid(),
            functions,
        },
        format,
    );
    Ok(SUCCESS)
}

pub fn commands(
    args: CommandsArgs,
    connect_args: &ConnectArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let session = connect(connect_args)?;
    let namespace = session
        .commands()
        .map_err(|err| session_error("catalogue unavailable", err))?;
    let commands = namespace
        .entries()
        .iter()
        .filter(|c| keep(&c.name, args.filter.as_deref()))
        .map(|c| CommandRow {
            name: c.name.clone(),
            description: c.description.clone(),
        })
        .collect();

    print_listing(
        &CommandsOutput {
            pid: session.pid(),
            commands,
        },
        format,
    );
    Ok(SUCCESS)
}
