use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("xeprapi {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: xeprapi");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("XEPRAPI_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("transport_library: {}", library_name());
    println!("features: session={}, cli=true", cfg!(feature = "session"));

    Ok(SUCCESS)
}

#[cfg(unix)]
fn library_name() -> &'static str {
    xeprapi_transport::library_file_name()
}

#[cfg(not(unix))]
fn library_name() -> &'static str {
    "unavailable"
}
