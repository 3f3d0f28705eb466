use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target of the per-value push/pop events of every call.
pub const STACK_TARGET: &str = "xeprapi_session::invoke";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-target filter. Stack traffic stays below trace unless asked for.
pub fn targets(level: LogLevel, stack_traffic: bool) -> Targets {
    let level = level.as_filter();
    let stack = if stack_traffic {
        LevelFilter::TRACE
    } else {
        level.min(LevelFilter::DEBUG)
    };
    Targets::new()
        .with_default(level)
        .with_target(STACK_TARGET, stack)
}

/// Install the stderr subscriber.
pub fn init_logging(format: LogFormat, level: LogLevel, stack_traffic: bool) {
    let max = if stack_traffic {
        LevelFilter::TRACE
    } else {
        level.as_filter()
    };
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(max)
        .with_ansi(false)
        .with_target(stack_traffic);
    let filter = targets(level, stack_traffic);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(filter).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(filter).try_init();
        }
    }
}
