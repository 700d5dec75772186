use std::time::Duration;

use vscp_codec::{find_reserved, CodecConfig, MAX_REQUEST_SIZE};

use crate::error::{ProtocolError, Result};

/// API version this engine speaks during the INIT handshake.
pub const API_VERSION: &str = "1.2";

/// Application name sent by [`Engine::init_with_defaults`](crate::Engine::init_with_defaults).
pub const DEFAULT_APP_NAME: &str = "vscp";

/// Database version sent by [`Engine::init_with_defaults`](crate::Engine::init_with_defaults).
pub const DEFAULT_DB_VERSION: &str = "1.0.0";

/// Per-message reply wait for sensor operations.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Reply wait for the INIT exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Window for bringing the transport up.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Local API version announced in INIT.
    pub api_version: String,
    /// Maximum built request size in bytes.
    pub max_message_size: usize,
    /// Reply wait for UPDATE/CONFIG/RESET/CONNECT/DISCONNECT.
    pub receive_timeout: Duration,
    /// Reply wait for INIT.
    pub handshake_timeout: Duration,
    /// Transport initialization window.
    pub init_timeout: Duration,
    /// Whether reply keys are matched case-sensitively.
    pub case_sensitive: bool,
    pub default_app_name: String,
    pub default_db_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            max_message_size: MAX_REQUEST_SIZE,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            case_sensitive: true,
            default_app_name: DEFAULT_APP_NAME.to_string(),
            default_db_version: DEFAULT_DB_VERSION.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_defaults(mut self, app: impl Into<String>, db: impl Into<String>) -> Self {
        self.default_app_name = app.into();
        self.default_db_version = db.into();
        self
    }

    /// Codec settings derived from this configuration.
    pub fn codec(&self) -> CodecConfig {
        CodecConfig {
            max_message_size: self.max_message_size,
            case_sensitive: self.case_sensitive,
        }
    }

    /// Reject configurations no request could be built with.
    pub fn validate(&self) -> Result<()> {
        require_wire_value("config", "api_version", &self.api_version)?;
        if self.max_message_size == 0 {
            return Err(ProtocolError::invalid_value(
                "config",
                "max_message_size must be greater than zero",
            ));
        }
        if self.receive_timeout.is_zero()
            || self.handshake_timeout.is_zero()
            || self.init_timeout.is_zero()
        {
            return Err(ProtocolError::invalid_value(
                "config",
                "timeouts must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// A non-empty value that can travel on the wire unescaped.
pub(crate) fn require_wire_value(origin: &str, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProtocolError::invalid_value(
            origin,
            format!("{field} must not be empty"),
        ));
    }
    require_unreserved(origin, field, value)
}

pub(crate) fn require_unreserved(origin: &str, field: &str, value: &str) -> Result<()> {
    match find_reserved(value) {
        Some(ch) => Err(ProtocolError::invalid_value(
            origin,
            format!("{field} '{}' contains reserved character {ch:?}", value.escape_debug()),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.api_version, "1.2");
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.receive_timeout, Duration::from_millis(100));
        assert!(config.case_sensitive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn codec_follows_config() {
        let codec = EngineConfig::default()
            .with_max_message_size(64)
            .with_case_sensitive(false)
            .codec();
        assert_eq!(codec.max_message_size, 64);
        assert!(!codec.case_sensitive);
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        let err = EngineConfig::default()
            .with_api_version("1&2")
            .validate()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidValue);

        assert!(EngineConfig::default()
            .with_receive_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_max_message_size(0)
            .validate()
            .is_err());
    }
}
