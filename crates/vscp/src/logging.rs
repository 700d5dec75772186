use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`. Wire traffic is logged by
/// these at `debug` (messages) and `trace` (raw lines).
const PROTOCOL_TARGETS: [&str; 5] = [
    "vscp",
    "vscp_codec",
    "vscp_transport",
    "vscp_engine",
    "vscp_emulator",
];

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

    fn shows_wire(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

/// Protocol crates log at `level`; everything else is capped at `warn` so
/// debugging a session doesn't bury the wire trace under dependency noise.
fn protocol_filter(level: LogLevel) -> Targets {
    let own = level.as_filter();
    PROTOCOL_TARGETS.iter().fold(
        Targets::new().with_default(own.min(LevelFilter::WARN)),
        |targets, target| targets.with_target(*target, own),
    )
}

/// Install the stderr subscriber.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.shows_wire());
    let registry = tracing_subscriber::registry().with(protocol_filter(level));

    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn debug_level_shows_protocol_crates_only() {
        let filter = protocol_filter(LogLevel::Debug);

        assert!(filter.would_enable("vscp_engine::engine", &Level::DEBUG));
        assert!(filter.would_enable("vscp_transport::stream", &Level::DEBUG));
        assert!(!filter.would_enable("vscp_transport::stream", &Level::TRACE));
        assert!(!filter.would_enable("mio::poll", &Level::DEBUG));
        assert!(filter.would_enable("mio::poll", &Level::WARN));
    }

    #[test]
    fn quiet_level_applies_everywhere() {
        let filter = protocol_filter(LogLevel::Error);

        assert!(!filter.would_enable("vscp_engine::engine", &Level::WARN));
        assert!(!filter.would_enable("ctrlc", &Level::WARN));
        assert!(filter.would_enable("vscp", &Level::ERROR));
    }
}
