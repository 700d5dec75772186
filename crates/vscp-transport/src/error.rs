use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No complete message arrived within the timeout.
    #[error("no message received within {0:?}")]
    Timeout(Duration),

    /// The channel has not been initialized or refused initialization.
    #[error("channel not ready: {0}")]
    NotReady(String),

    /// The remote end closed the channel.
    #[error("channel disconnected")]
    Disconnected,

    /// A message exceeds the channel's maximum line length.
    #[error("message too large ({len} bytes, max {max})")]
    MessageTooLarge { len: usize, max: usize },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An implementation-specific failure that fits no other kind.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// True when the error is a receive timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
