use std::fmt;

use tracing::{error, warn};
use vscp_codec::CodecError;
use vscp_transport::TransportError;

/// Classification of a protocol failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad local input; never reaches the wire.
    InvalidValue,
    /// A referenced sensor or value is absent.
    NotFound,
    /// Operation attempted before a successful `init`.
    NotInitialized,
    /// Transport send/receive failure.
    IOError,
    /// No reply within the time budget.
    Timeout,
    /// Endpoint reported `status=0`, or the reply belongs to another sensor.
    MethodFailed,
    /// A message is too large or structurally invalid.
    EncodingError,
    /// Unclassified failure, usually wrapped from a foreign error type.
    NotDefined,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InvalidValue => "InvalidValue",
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::NotInitialized => "NotInitialized",
            ErrorCategory::IOError => "IOError",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::MethodFailed => "MethodFailed",
            ErrorCategory::EncodingError => "EncodingError",
            ErrorCategory::NotDefined => "NotDefined",
        }
    }

    /// Severity an error of this category carries unless raised otherwise.
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorCategory::NotInitialized => Severity::Critical,
            _ => Severity::Error,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorCategory::InvalidValue => "invalid value",
            ErrorCategory::NotFound => "value not found",
            ErrorCategory::NotInitialized => "protocol not initialized",
            ErrorCategory::IOError => "I/O operation failed",
            ErrorCategory::Timeout => "operation timed out",
            ErrorCategory::MethodFailed => "protocol method failed",
            ErrorCategory::EncodingError => "invalid message encoding",
            ErrorCategory::NotDefined => "unknown error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a caller should treat a failure.
///
/// `Critical` means the channel or session can no longer be trusted
/// (never initialized, or the handshake itself lost the line); callers
/// typically halt instead of continuing against the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Critical,
}

/// A classified protocol failure with an optional owned cause.
///
/// The message is never empty. Each error owns its cause exclusively; the
/// chain is usually one or two links deep (engine → transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProtocolError {
    category: ErrorCategory,
    severity: Severity,
    message: String,
    origin: String,
    #[source]
    cause: Option<Box<ProtocolError>>,
}

impl ProtocolError {
    /// Create an error. An empty message is replaced by the category's
    /// default text.
    pub fn new(category: ErrorCategory, origin: impl Into<String>, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = category.default_message().to_string();
        }
        Self {
            category,
            severity: category.default_severity(),
            message,
            origin: origin.into(),
            cause: None,
        }
    }

    pub fn invalid_value(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidValue, origin, message)
    }

    pub fn not_found(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, origin, message)
    }

    pub fn not_initialized(origin: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::NotInitialized,
            origin,
            "protocol not initialized; call init first",
        )
    }

    pub fn method_failed(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::MethodFailed, origin, message)
    }

    pub fn encoding(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::EncodingError, origin, message)
    }

    /// Attach the lower-level error this one wraps.
    pub fn with_cause(mut self, cause: ProtocolError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Raise the severity to critical.
    pub fn critical(mut self) -> Self {
        self.severity = Severity::Critical;
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn cause(&self) -> Option<&ProtocolError> {
        self.cause.as_deref()
    }

    /// Iterate from this error down to the innermost cause.
    pub fn chain(&self) -> impl Iterator<Item = &ProtocolError> {
        std::iter::successors(Some(self), |err| err.cause())
    }

    /// Render the whole chain, one indented line per link.
    ///
    /// ```text
    /// (update) UPDATE receive failed [IOError]
    ///     (transport) channel disconnected [IOError]
    /// ```
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (depth, err) in self.chain().enumerate() {
            if depth > 0 {
                out.push('\n');
            }
            for _ in 0..depth {
                out.push_str("    ");
            }
            out.push_str(&format!("({}) {} [{}]", err.origin, err.message, err.category));
        }
        out
    }

    /// Emit the report through `tracing`, at error level when critical.
    pub fn log(&self) {
        let report = self.report();
        match self.severity {
            Severity::Critical => error!(category = %self.category, "{report}"),
            Severity::Error => warn!(category = %self.category, "{report}"),
        }
    }
}

impl From<TransportError> for ProtocolError {
    fn from(err: TransportError) -> Self {
        let category = match &err {
            TransportError::Timeout(_) => ErrorCategory::Timeout,
            TransportError::MessageTooLarge { .. } => ErrorCategory::EncodingError,
            TransportError::Other(_) => ErrorCategory::NotDefined,
            _ => ErrorCategory::IOError,
        };
        ProtocolError::new(category, "transport", err.to_string())
    }
}

impl From<CodecError> for ProtocolError {
    fn from(err: CodecError) -> Self {
        ProtocolError::new(ErrorCategory::EncodingError, "codec", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
