use serde::Serialize;
use xeprapi_transport::{find_instances, Instance};

use crate::cmd::{load_library, ConnectArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_listing, Listing, OutputFormat};

#[derive(Serialize)]
struct InstancesOutput {
    instances: Vec<Instance>,
}

impl Listing for InstancesOutput {
    fn headers(&self) -> Vec<&'static str> {
        vec!["PID", "TITLE"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.instances
            .iter()
            .map(|i| vec![i.pid.to_string(), i.title.clone()])
            .collect()
    }
}

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let library = load_library(connect)?;
    let instances = find_instances(library.as_ref())
        .map_err(|err| transport_error("discovery failed", err))?;
    tracing::debug!(count = instances.len(), "peers discovered");
    print_listing(&InstancesOutput { instances }, format);
    Ok(SUCCESS)
}
