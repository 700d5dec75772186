use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use vscp_engine::{DEFAULT_APP_NAME, DEFAULT_DB_VERSION};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod emulate;
pub mod ops;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the sensor-endpoint emulator on a socket.
    Emulate(EmulateArgs),
    /// Perform the INIT handshake and print the reply.
    Init(InitArgs),
    /// Read all current parameters of a sensor.
    Update(UidArgs),
    /// Send configuration parameters to a sensor.
    Config(ConfigArgs),
    /// Reset a sensor (or `all`).
    Reset(UidArgs),
    /// Connect a sensor to hardware pins.
    Connect(ConnectArgs),
    /// Disconnect a sensor from its pins.
    Disconnect(UidArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Emulate(args) => emulate::run(args, format),
        Command::Init(args) => ops::init(args, format),
        Command::Update(args) => ops::update(args, format),
        Command::Config(args) => ops::config(args, format),
        Command::Reset(args) => ops::reset(args, format),
        Command::Connect(args) => ops::connect(args, format),
        Command::Disconnect(args) => ops::disconnect(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection and handshake settings shared by every operation.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Socket path of the endpoint (or serial bridge).
    #[arg(long, env = "VSCP_SOCKET", value_name = "SOCKET")]
    pub socket: PathBuf,
    /// Application name announced in INIT.
    #[arg(long, env = "VSCP_APP", default_value = DEFAULT_APP_NAME)]
    pub app: String,
    /// Database version announced in INIT.
    #[arg(long, env = "VSCP_DB", default_value = DEFAULT_DB_VERSION)]
    pub db: String,
    /// Reply timeout per request (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Transport initialization window (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s")]
    pub init_timeout: String,
    /// Match reply keys case-insensitively.
    #[arg(long)]
    pub case_insensitive: bool,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Socket path to bind.
    pub socket: PathBuf,
    /// JSON sensor table to serve instead of the built-in one.
    #[arg(long, value_name = "FILE")]
    pub sensors: Option<PathBuf>,
    /// Exit after serving N connections.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct UidArgs {
    /// Sensor UID.
    pub uid: String,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Sensor UID.
    pub uid: String,
    /// Parameter to send, repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
    pub set: Vec<String>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Sensor UID.
    pub uid: String,
    /// Comma-separated pin list (e.g. 5,6).
    pub pins: String,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
