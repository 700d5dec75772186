mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vscp", version, about = "Sensor endpoint protocol CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_subcommand() {
        let cli = Cli::try_parse_from([
            "vscp",
            "connect",
            "S1",
            "5,6",
            "--socket",
            "/tmp/vscp.sock",
            "--timeout",
            "500ms",
        ])
        .expect("connect args should parse");

        match cli.command {
            Command::Connect(args) => {
                assert_eq!(args.uid, "S1");
                assert_eq!(args.pins, "5,6");
                assert_eq!(args.session.app, "vscp");
                assert_eq!(args.session.db, "1.0.0");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_requires_a_parameter() {
        let err = Cli::try_parse_from(["vscp", "config", "S1", "--socket", "/tmp/vscp.sock"])
            .expect_err("config without --set should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_emulate_with_count() {
        let cli = Cli::try_parse_from(["vscp", "emulate", "/tmp/vscp.sock", "--count", "2"])
            .expect("emulate args should parse");
        assert!(matches!(cli.command, Command::Emulate(ref args) if args.count == Some(2)));
    }
}
