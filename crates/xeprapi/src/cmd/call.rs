use serde::Serialize;
use xeprapi_codec::StackValue;

use crate::cmd::{connect, CallArgs, ConnectArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_listing, Listing, OutputFormat};

#[derive(Serialize)]
struct CallOutput {
    pid: u32,
    function: String,
    args: Vec<StackValue>,
    result: Option<StackValue>,
}

impl Listing for CallOutput {
    fn headers(&self) -> Vec<&'static str> {
        vec!["FUNCTION", "RESULT"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let result = self
            .result
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "(none)".to_string());
        vec![vec![self.function.clone(), result]]
    }
}

pub fn run(args: CallArgs, connect_args: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let values = parse_args(&args.args, args.raw);
    let session = connect(connect_args)?;
    let result = session
        .call(&args.name, values.clone())
        .map_err(|err| session_error(&format!("{} failed", args.name), err))?;

    print_listing(
        &CallOutput {
            pid: session.pid(),
            function: args.name,
            args: values,
            result,
        },
        format,
    );
    Ok(SUCCESS)
}

fn parse_args(raw: &[String], as_text: bool) -> Vec<StackValue> {
    raw.iter()
        .map(|arg| {
            if as_text {
                StackValue::from(arg.as_str())
            } else {
                StackValue::infer(arg)
            }
        })
        .collect()
}
