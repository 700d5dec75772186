//! Protocol engine for VSCP sensor endpoints.
//!
//! An [`Engine`] owns one [`Transport`](vscp_transport::Transport) and the
//! handshake state for it. Every operation is a single synchronous
//! request/response round-trip:
//!
//! ```text
//! request  ?type=UPDATE&id=sensor_001
//! reply    ?id=sensor_001&status=1&Temperature=25.5
//! ```
//!
//! Failures are reported as [`ProtocolError`] values classified by
//! [`ErrorCategory`]; nothing is retried and nothing is silently dropped.

pub mod config;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod request;
pub mod types;

pub use config::{
    EngineConfig, API_VERSION, DEFAULT_APP_NAME, DEFAULT_DB_VERSION, DEFAULT_HANDSHAKE_TIMEOUT,
    DEFAULT_INIT_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT,
};
pub use engine::Engine;
pub use error::{ErrorCategory, ProtocolError, Result, Severity};
pub use handshake::{api_versions_match, remote_api_version, require_api_match};
pub use request::{interpret_reply, RequestKind};
pub use types::{EngineState, OperationResult, PinSpecification, SensorUid};
pub use vscp_codec::ParameterMap;
