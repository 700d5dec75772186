use std::time::Duration;

use tracing::{debug, info};
use vscp_codec::{find_folded_duplicate, ParameterMap};
use vscp_transport::{Transport, TransportError};

use crate::config::{require_unreserved, require_wire_value, EngineConfig};
use crate::error::{ErrorCategory, ProtocolError, Result};
use crate::request::{
    interpret_reply, RequestKind, KEY_API, KEY_APP, KEY_DB, KEY_ID, KEY_PINS, KEY_TYPE,
};
use crate::types::{EngineState, OperationResult, PinSpecification, SensorUid};

/// Request/response engine bound to one transport.
///
/// The engine starts `Uninitialized`. Only a successful [`init`](Self::init)
/// moves it to `Initialized`; nothing moves it back, and a failed call of
/// any kind leaves the state as it was. Every operation performs exactly one
/// round-trip and never retries.
///
/// The engine holds no lock. Sharing one between threads needs external
/// serialization.
pub struct Engine<T> {
    transport: T,
    config: EngineConfig,
    state: EngineState,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Initialize,
    Send,
    Receive,
}

impl<T: Transport> Engine<T> {
    /// Create an engine with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self {
            transport,
            config,
            state: EngineState::Uninitialized,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Local API version announced during INIT.
    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    /// Engine configuration.
    pub fn settings(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the engine and return its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Perform the INIT handshake.
    ///
    /// Brings the transport up within the configured init window, then sends
    /// `?type=INIT&app=<app>&db=<db>&api=<api_version>` and waits for the
    /// reply. The reply's parameters (minus `status`) are returned so the
    /// caller can apply its own version policy; see [`crate::handshake`].
    /// Transport failures on this path are critical.
    pub fn init(&mut self, app: &str, db: &str) -> OperationResult {
        let kind = RequestKind::Init;
        let origin = kind.origin();

        self.config.validate()?;
        require_wire_value(origin, "app name", app)?;
        require_wire_value(origin, "db version", db)?;

        let init_timeout = self.config.init_timeout;
        self.transport
            .initialize(init_timeout)
            .map_err(|err| transport_failure(kind, Stage::Initialize, err, init_timeout, true))?;
        debug!(transport = self.transport.name(), "transport initialized");

        let request = kind
            .start(None)
            .with(KEY_APP, app)
            .with(KEY_DB, db)
            .with(KEY_API, self.config.api_version.as_str());

        let params = self.exchange(kind, None, &request, self.config.handshake_timeout, true)?;

        let negotiated_api_version = params
            .get(KEY_API)
            .unwrap_or(self.config.api_version.as_str())
            .to_string();
        let db_version = params.get(KEY_DB).unwrap_or(db).to_string();
        info!(
            app,
            api = %negotiated_api_version,
            db = %db_version,
            "protocol initialized"
        );
        self.state = EngineState::Initialized {
            negotiated_api_version,
            db_version,
        };

        Ok(params)
    }

    /// [`init`](Self::init) with the configured default app name and db version.
    pub fn init_with_defaults(&mut self) -> OperationResult {
        let app = self.config.default_app_name.clone();
        let db = self.config.default_db_version.clone();
        self.init(&app, &db)
    }

    /// Read every current parameter of a sensor.
    pub fn update(&mut self, uid: impl AsRef<str>) -> OperationResult {
        let kind = RequestKind::Update;
        let uid = self.begin(kind, uid.as_ref())?;
        let request = kind.start(Some(&uid));
        self.scoped_exchange(kind, &uid, &request)
    }

    /// Forward a parameter set to a sensor.
    ///
    /// Keys may not be `type` or `id`, and neither keys nor values may
    /// contain wire-reserved characters.
    pub fn config(&mut self, uid: impl AsRef<str>, params: &ParameterMap) -> OperationResult {
        let kind = RequestKind::Config;
        let uid = self.begin(kind, uid.as_ref())?;
        let origin = kind.origin();

        if !self.config.case_sensitive {
            if let Some(key) = find_folded_duplicate(params) {
                return Err(ProtocolError::invalid_value(
                    origin,
                    format!("parameter key '{key}' collides with another key when case is ignored"),
                ));
            }
        }

        let mut request = kind.start(Some(&uid));
        for (key, value) in params.iter() {
            require_wire_value(origin, "parameter key", key)?;
            if key.eq_ignore_ascii_case(KEY_TYPE) || key.eq_ignore_ascii_case(KEY_ID) {
                return Err(ProtocolError::invalid_value(
                    origin,
                    format!("parameter key '{key}' is reserved by the protocol"),
                ));
            }
            require_unreserved(origin, "parameter value", value)?;
            request.insert(key, value);
        }

        self.scoped_exchange(kind, &uid, &request)
    }

    pub fn reset(&mut self, uid: impl AsRef<str>) -> OperationResult {
        let kind = RequestKind::Reset;
        let uid = self.begin(kind, uid.as_ref())?;
        let request = kind.start(Some(&uid));
        self.scoped_exchange(kind, &uid, &request)
    }

    /// Connect a sensor to the pins in `pins` (`"5,6,7"`).
    pub fn connect(&mut self, uid: impl AsRef<str>, pins: &str) -> OperationResult {
        let kind = RequestKind::Connect;
        let uid = self.begin(kind, uid.as_ref())?;
        let pins: PinSpecification = pins.parse()?;
        self.connect_checked(&uid, &pins)
    }

    /// Connect a sensor to an already parsed pin list.
    pub fn connect_pins(&mut self, uid: impl AsRef<str>, pins: &PinSpecification) -> OperationResult {
        let uid = self.begin(RequestKind::Connect, uid.as_ref())?;
        self.connect_checked(&uid, pins)
    }

    pub fn disconnect(&mut self, uid: impl AsRef<str>) -> OperationResult {
        let kind = RequestKind::Disconnect;
        let uid = self.begin(kind, uid.as_ref())?;
        let request = kind.start(Some(&uid));
        self.scoped_exchange(kind, &uid, &request)
    }

    fn connect_checked(&mut self, uid: &SensorUid, pins: &PinSpecification) -> OperationResult {
        let kind = RequestKind::Connect;
        let request = kind.start(Some(uid)).with(KEY_PINS, pins.to_string());
        self.scoped_exchange(kind, uid, &request)
    }

    /// State guard and UID validation shared by the scoped operations.
    fn begin(&self, kind: RequestKind, uid: &str) -> Result<SensorUid> {
        if !self.state.is_initialized() {
            return Err(ProtocolError::not_initialized(kind.origin()));
        }
        SensorUid::new(uid)
    }

    fn scoped_exchange(
        &mut self,
        kind: RequestKind,
        uid: &SensorUid,
        request: &ParameterMap,
    ) -> OperationResult {
        self.exchange(kind, Some(uid), request, self.config.receive_timeout, false)
    }

    fn exchange(
        &mut self,
        kind: RequestKind,
        uid: Option<&SensorUid>,
        request: &ParameterMap,
        timeout: Duration,
        critical: bool,
    ) -> OperationResult {
        let codec = self.config.codec();
        let message = codec.build(request).map_err(|err| {
            ProtocolError::encoding(kind.origin(), format!("{kind} request could not be built"))
                .with_cause(err.into())
        })?;

        debug!(%kind, request = %message, "sending request");
        self.transport
            .send(&message)
            .map_err(|err| transport_failure(kind, Stage::Send, err, timeout, critical))?;

        let raw = self
            .transport
            .receive(timeout)
            .map_err(|err| transport_failure(kind, Stage::Receive, err, timeout, critical))?;
        debug!(%kind, reply = %raw, "received reply");

        interpret_reply(kind, uid, codec.parse(&raw))
    }
}

/// Wrap a transport failure, keeping the transport's error as the cause.
fn transport_failure(
    kind: RequestKind,
    stage: Stage,
    err: TransportError,
    timeout: Duration,
    critical: bool,
) -> ProtocolError {
    let cause = ProtocolError::from(err);
    let category = match cause.category() {
        ErrorCategory::NotDefined => ErrorCategory::IOError,
        other => other,
    };

    let message = match (stage, category) {
        (Stage::Initialize, ErrorCategory::Timeout) => {
            format!("transport not ready within {timeout:?}")
        }
        (Stage::Initialize, _) => "transport initialization failed".to_string(),
        (_, ErrorCategory::Timeout) => format!("no {kind} reply within {timeout:?}"),
        (Stage::Send, _) => format!("{kind} request could not be sent"),
        (Stage::Receive, _) => format!("{kind} reply could not be received"),
    };

    let err = ProtocolError::new(category, kind.origin(), message).with_cause(cause);
    if critical && matches!(category, ErrorCategory::IOError | ErrorCategory::Timeout) {
        err.critical()
    } else {
        err
    }
}

impl<T> std::fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use vscp_transport::MemoryTransport;

    use super::*;

    fn initialized() -> (Engine<MemoryTransport>, MemoryTransport) {
        let handle = MemoryTransport::new();
        handle.reply("?status=1");
        let mut engine = Engine::new(handle.clone());
        engine.init("DemoApp", "1.0").unwrap();
        (engine, handle)
    }

    #[test]
    fn init_records_negotiated_versions() {
        let handle = MemoryTransport::new();
        handle.reply("?status=1&api=1.3&db=2.0.0");
        let mut engine = Engine::new(handle.clone());

        let params = engine.init("DemoApp", "1.0").unwrap();
        assert_eq!(params.get("api"), Some("1.3"));
        assert_eq!(
            engine.state(),
            &EngineState::Initialized {
                negotiated_api_version: "1.3".to_string(),
                db_version: "2.0.0".to_string(),
            }
        );
        assert_eq!(handle.initialize_count(), 1);
    }

    #[test]
    fn init_with_defaults_uses_config_names() {
        let handle = MemoryTransport::new();
        handle.reply("?status=1");
        let config = EngineConfig::default().with_defaults("bench", "3.1.4");
        let mut engine = Engine::with_config(handle.clone(), config);

        engine.init_with_defaults().unwrap();
        assert_eq!(handle.sent(), vec!["?type=INIT&app=bench&db=3.1.4&api=1.2"]);
        assert_eq!(
            engine.state(),
            &EngineState::Initialized {
                negotiated_api_version: "1.2".to_string(),
                db_version: "3.1.4".to_string(),
            }
        );
    }

    #[test]
    fn init_transport_failure_is_critical_and_keeps_state() {
        let handle = MemoryTransport::new();
        handle.fail_initialize(true);
        let mut engine = Engine::new(handle.clone());

        let err = engine.init("DemoApp", "1.0").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::IOError);
        assert!(err.is_critical());
        assert_eq!(err.cause().map(|c| c.origin()), Some("transport"));
        assert_eq!(handle.send_count(), 0);
        assert!(!engine.is_initialized());
    }

    #[test]
    fn init_timeout_is_critical() {
        let handle = MemoryTransport::new();
        let mut engine = Engine::new(handle);

        let err = engine.init("DemoApp", "1.0").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(err.is_critical());
    }

    #[test]
    fn failed_reinit_keeps_previous_state() {
        let (mut engine, handle) = initialized();
        let before = engine.state().clone();

        handle.reply("?status=0&error=Version mismatch");
        let err = engine.init("DemoApp", "9.9").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MethodFailed);
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn init_rejects_reserved_app_name_locally() {
        let handle = MemoryTransport::new();
        let mut engine = Engine::new(handle.clone());

        let err = engine.init("Demo&App", "1.0").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidValue);
        assert!(err.cause().is_none());
        assert_eq!(handle.initialize_count(), 0);
    }

    #[test]
    fn config_forwards_parameters_in_order() {
        let (mut engine, handle) = initialized();
        handle.reply("?id=S1&status=1");

        let params = ParameterMap::new()
            .with("Threshold", "30")
            .with("Unit", "C");
        let result = engine.config("S1", &params).unwrap();

        assert!(result.is_empty());
        assert_eq!(
            handle.sent().last().map(String::as_str),
            Some("?type=CONFIG&id=S1&Threshold=30&Unit=C")
        );
    }

    #[test]
    fn config_rejects_protocol_keys() {
        let (mut engine, handle) = initialized();
        let sent = handle.send_count();

        let params = ParameterMap::new().with("id", "S2");
        let err = engine.config("S1", &params).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidValue);

        let params = ParameterMap::new().with("note", "a=b");
        assert!(engine.config("S1", &params).is_err());
        assert_eq!(handle.send_count(), sent);
    }

    #[test]
    fn case_insensitive_config_rejects_keys_differing_in_case() {
        let handle = MemoryTransport::new();
        handle.reply("?status=1");
        let config = EngineConfig::default().with_case_sensitive(false);
        let mut engine = Engine::with_config(handle.clone(), config);
        engine.init("DemoApp", "1.0").unwrap();

        let params = ParameterMap::new().with("Rate", "1").with("rate", "2");
        let err = engine.config("S1", &params).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::InvalidValue);
        assert!(err.message().contains("'rate'"));
        assert_eq!(handle.sent(), vec!["?type=INIT&app=DemoApp&db=1.0&api=1.2"]);
    }

    #[test]
    fn case_sensitive_config_keeps_keys_differing_in_case() {
        let (mut engine, handle) = initialized();
        handle.reply("?id=S1&status=1");

        let params = ParameterMap::new().with("Rate", "1").with("rate", "2");
        engine.config("S1", &params).unwrap();
        assert_eq!(
            handle.sent().last().map(String::as_str),
            Some("?type=CONFIG&id=S1&Rate=1&rate=2")
        );
    }

    #[test]
    fn reset_and_disconnect_requests() {
        let (mut engine, handle) = initialized();
        handle.reply("?id=S1&status=1").reply("?id=S1&status=1&pins=5,6");

        engine.reset("S1").unwrap();
        let params = engine.disconnect("S1").unwrap();
        assert_eq!(params.get("pins"), Some("5,6"));

        let sent = handle.sent();
        assert_eq!(sent[1], "?type=RESET&id=S1");
        assert_eq!(sent[2], "?type=DISCONNECT&id=S1");
    }

    #[test]
    fn connect_validates_pins_before_sending() {
        let (mut engine, handle) = initialized();

        let err = engine.connect("S1", "").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidValue);
        assert!(engine.connect("S1", "5,x").is_err());
        assert_eq!(handle.send_count(), 1);
    }

    #[test]
    fn connect_pins_keeps_order_and_duplicates() {
        let (mut engine, handle) = initialized();
        handle.reply("?id=S1&status=1");

        let pins = PinSpecification::new(vec![7, 5, 7]).unwrap();
        engine.connect_pins("S1", &pins).unwrap();
        assert_eq!(
            handle.sent().last().map(String::as_str),
            Some("?type=CONNECT&id=S1&pins=7,5,7")
        );
    }

    #[test]
    fn send_failure_wraps_transport_error() {
        let (mut engine, handle) = initialized();
        handle.fail_sends(true);

        let err = engine.update("S1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::IOError);
        assert!(!err.is_critical());
        assert_eq!(err.message(), "UPDATE request could not be sent");
        assert_eq!(
            err.cause().map(ProtocolError::message),
            Some("channel disconnected")
        );
    }

    #[test]
    fn foreign_transport_error_surfaces_as_io_error() {
        let (mut engine, handle) = initialized();
        handle.reply_failure("uart overrun");

        let err = engine.reset("S1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::IOError);
        assert_eq!(
            err.cause().map(ProtocolError::category),
            Some(ErrorCategory::NotDefined)
        );
    }

    #[test]
    fn oversized_request_is_encoding_error() {
        let handle = MemoryTransport::new();
        handle.reply("?status=1");
        let config = EngineConfig::default().with_max_message_size(48);
        let mut engine = Engine::with_config(handle.clone(), config);
        engine.init("A", "1").unwrap();

        let params = ParameterMap::new().with("Description", "x".repeat(64));
        let err = engine.config("S1", &params).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::EncodingError);
        assert_eq!(err.cause().map(ProtocolError::origin), Some("codec"));
        assert_eq!(handle.send_count(), 1);
    }

    #[test]
    fn case_insensitive_replies_match_keys() {
        let handle = MemoryTransport::new();
        handle.reply("?STATUS=1").reply("?ID=S1&Status=1&Temp=23.5");
        let config = EngineConfig::default().with_case_sensitive(false);
        let mut engine = Engine::with_config(handle, config);

        engine.init("DemoApp", "1.0").unwrap();
        let params = engine.update("S1").unwrap();
        assert_eq!(params.get("temp"), Some("23.5"));
    }
}
