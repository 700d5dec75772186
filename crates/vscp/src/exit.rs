use std::fmt;
use std::io;

use vscp_emulator::EmulatorError;
use vscp_engine::{ErrorCategory, ProtocolError};
use vscp_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NOT_INITIALIZED: i32 = 70;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn category_code(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::MethodFailed | ErrorCategory::NotFound => FAILURE,
        ErrorCategory::IOError => TRANSPORT_ERROR,
        ErrorCategory::EncodingError => DATA_INVALID,
        ErrorCategory::InvalidValue => USAGE,
        ErrorCategory::NotInitialized => NOT_INITIALIZED,
        ErrorCategory::Timeout => TIMEOUT,
        ErrorCategory::NotDefined => INTERNAL,
    }
}

/// Log the full chain, then reduce it to an exit code and one-line message.
pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    err.log();
    let mut message = format!("{context}: {err}");
    if let Some(cause) = err.cause() {
        message.push_str(&format!(" ({cause})"));
    }
    CliError::new(category_code(err.category()), message)
}

pub fn emulator_error(context: &str, err: EmulatorError) -> CliError {
    match err {
        EmulatorError::Read { source, .. } => io_error(context, source),
        EmulatorError::Transport(err) => transport_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
