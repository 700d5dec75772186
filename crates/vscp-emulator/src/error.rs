use std::path::PathBuf;

use vscp_transport::TransportError;

/// Errors raised while loading sensor tables or serving a channel.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    /// The sensor table file could not be read.
    #[error("failed to read sensor table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The sensor table is not valid JSON for the expected shape.
    #[error("invalid sensor table JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The sensor table parsed but violates a table rule.
    #[error("invalid sensor table: {0}")]
    InvalidTable(String),

    /// The channel being served failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, EmulatorError>;
