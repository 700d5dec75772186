use std::path::Path;

use tracing::debug;
use vscp_codec::ParameterMap;
use vscp_engine::{Engine, EngineConfig, OperationResult};
use vscp_transport::Transport;

use crate::cmd::{parse_duration, ConfigArgs, ConnectArgs, InitArgs, SessionArgs, UidArgs};
use crate::exit::{protocol_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_params, OutputFormat};

type Session = Engine<Box<dyn Transport>>;

pub fn init(args: InitArgs, format: OutputFormat) -> CliResult<i32> {
    let (_engine, params) = open_session(&args.session)?;
    print_params("init", None, &params, format);
    Ok(SUCCESS)
}

pub fn update(args: UidArgs, format: OutputFormat) -> CliResult<i32> {
    let (mut engine, _) = open_session(&args.session)?;
    finish("update", &args.uid, engine.update(&args.uid), format)
}

pub fn config(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    let params = parse_assignments(&args.set)?;
    let (mut engine, _) = open_session(&args.session)?;
    finish("config", &args.uid, engine.config(&args.uid, &params), format)
}

pub fn reset(args: UidArgs, format: OutputFormat) -> CliResult<i32> {
    let (mut engine, _) = open_session(&args.session)?;
    finish("reset", &args.uid, engine.reset(&args.uid), format)
}

pub fn connect(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let (mut engine, _) = open_session(&args.session)?;
    finish(
        "connect",
        &args.uid,
        engine.connect(&args.uid, &args.pins),
        format,
    )
}

pub fn disconnect(args: UidArgs, format: OutputFormat) -> CliResult<i32> {
    let (mut engine, _) = open_session(&args.session)?;
    finish("disconnect", &args.uid, engine.disconnect(&args.uid), format)
}

fn finish(operation: &str, uid: &str, result: OperationResult, format: OutputFormat) -> CliResult<i32> {
    let params = result.map_err(|err| protocol_error(&format!("{operation} failed"), err))?;
    print_params(operation, Some(uid), &params, format);
    Ok(SUCCESS)
}

/// Connect and run the INIT handshake. Engine state is per process, so
/// every command starts here.
fn open_session(args: &SessionArgs) -> CliResult<(Session, ParameterMap)> {
    let timeout = parse_duration(&args.timeout)?;
    let init_timeout = parse_duration(&args.init_timeout)?;

    let config = EngineConfig::default()
        .with_receive_timeout(timeout)
        .with_handshake_timeout(timeout)
        .with_init_timeout(init_timeout)
        .with_case_sensitive(!args.case_insensitive)
        .with_defaults(args.app.as_str(), args.db.as_str());

    let transport = open_channel(&args.socket)?;
    let mut engine = Engine::with_config(transport, config);
    let params = engine
        .init_with_defaults()
        .map_err(|err| protocol_error("init failed", err))?;
    debug!(state = ?engine.state(), "session ready");

    Ok((engine, params))
}

#[cfg(unix)]
fn open_channel(path: &Path) -> CliResult<Box<dyn Transport>> {
    use vscp_transport::{StreamConfig, UnixDomainSocket};

    let transport = UnixDomainSocket::connect_transport(path, StreamConfig::default())
        .map_err(|err| crate::exit::transport_error("connect failed", err))?;
    Ok(Box::new(transport))
}

#[cfg(not(unix))]
fn open_channel(path: &Path) -> CliResult<Box<dyn Transport>> {
    Err(CliError::new(
        USAGE,
        format!(
            "cannot open {}: socket channels require a unix platform",
            path.display()
        ),
    ))
}

/// Parse repeated `KEY=VALUE` arguments, keeping their order.
fn parse_assignments(items: &[String]) -> CliResult<ParameterMap> {
    let mut params = ParameterMap::with_capacity(items.len());
    for item in items {
        let (key, value) = item.split_once('=').ok_or_else(|| {
            CliError::new(USAGE, format!("--set expects KEY=VALUE, got '{item}'"))
        })?;
        if key.is_empty() {
            return Err(CliError::new(USAGE, format!("--set has an empty key: '{item}'")));
        }
        params.insert(key, value);
    }
    Ok(params)
}
