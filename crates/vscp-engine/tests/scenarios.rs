use vscp_engine::{
    require_api_match, Engine, EngineState, ErrorCategory, ParameterMap, API_VERSION,
};
use vscp_transport::MemoryTransport;

fn engine_after_init() -> (Engine<MemoryTransport>, MemoryTransport) {
    let handle = MemoryTransport::new();
    handle.reply("?status=1");
    let mut engine = Engine::new(handle.clone());
    engine
        .init("DemoApp", "1.0")
        .expect("init should succeed against a scripted ok reply");
    (engine, handle)
}

#[test]
fn init_handshake_request_and_state() {
    let handle = MemoryTransport::new();
    handle.reply("?status=1");
    let mut engine = Engine::new(handle.clone());
    assert_eq!(engine.state(), &EngineState::Uninitialized);

    let params = engine.init("DemoApp", "1.0").expect("init should succeed");

    assert!(params.is_empty());
    assert_eq!(
        handle.sent(),
        vec![format!("?type=INIT&app=DemoApp&db=1.0&api={API_VERSION}")]
    );
    assert!(engine.is_initialized());
    assert!(handle.is_initialized());
}

#[test]
fn update_returns_sensor_parameters() {
    let (mut engine, handle) = engine_after_init();
    handle.reply("?id=S1&status=1&temp=23.5");

    let params = engine.update("S1").expect("update should succeed");

    assert_eq!(params, ParameterMap::new().with("temp", "23.5"));
    assert_eq!(handle.sent()[1], "?type=UPDATE&id=S1");
}

#[test]
fn connect_failure_carries_endpoint_error() {
    let (mut engine, handle) = engine_after_init();
    handle.reply("?id=S1&status=0&error=PinBusy");

    let err = engine.connect("S1", "5,6").expect_err("connect should fail");

    assert_eq!(handle.sent()[1], "?type=CONNECT&id=S1&pins=5,6");
    assert_eq!(err.category(), ErrorCategory::MethodFailed);
    assert_eq!(err.message(), "PinBusy");
    assert!(engine.is_initialized());
}

#[test]
fn receive_timeout_is_distinct_from_rejection() {
    let (mut engine, handle) = engine_after_init();
    handle.reply_timeout();

    let err = engine.update("S1").expect_err("update should time out");

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(
        err.cause().map(|cause| cause.category()),
        Some(ErrorCategory::Timeout)
    );
    assert!(!err.is_critical());
}

#[test]
fn operations_before_init_never_touch_the_transport() {
    let handle = MemoryTransport::new();
    let mut engine = Engine::new(handle.clone());
    let params = ParameterMap::new().with("rate", "10");

    let results = [
        engine.update("S1"),
        engine.config("S1", &params),
        engine.reset("S1"),
        engine.connect("S1", "5,6"),
        engine.disconnect("S1"),
    ];

    for result in results {
        let err = result.expect_err("operation should fail before init");
        assert_eq!(err.category(), ErrorCategory::NotInitialized);
        assert!(err.is_critical());
    }
    assert_eq!(handle.send_count(), 0);
    assert_eq!(handle.initialize_count(), 0);
}

#[test]
fn mismatched_reply_id_fails_regardless_of_status() {
    let (mut engine, handle) = engine_after_init();
    handle.reply("?id=S2&status=1").reply("?id=S2&status=0&error=Busy");

    let ok_status = engine.reset("S1").expect_err("mismatched id should fail");
    let failed_status = engine.reset("S1").expect_err("mismatched id should fail");

    assert_eq!(ok_status.category(), ErrorCategory::MethodFailed);
    assert_eq!(failed_status.category(), ErrorCategory::MethodFailed);
    assert_ne!(failed_status.message(), "Busy");
}

#[test]
fn failed_init_can_be_retried() {
    let handle = MemoryTransport::new();
    handle
        .reply("?status=0&error=Version mismatch")
        .reply("?status=1&api=1.2");
    let mut engine = Engine::new(handle.clone());

    let err = engine.init("DemoApp", "0.9").expect_err("first init should fail");
    assert_eq!(err.category(), ErrorCategory::MethodFailed);
    assert!(!engine.is_initialized());

    let params = engine.init("DemoApp", "1.0").expect("retry should succeed");
    assert!(engine.is_initialized());
    assert!(require_api_match(engine.api_version(), &params).is_ok());
}

#[test]
fn disconnected_channel_reports_io_error_with_cause() {
    let (mut engine, handle) = engine_after_init();
    handle.reply_disconnect();

    let err = engine.disconnect("S1").expect_err("disconnect should fail");

    assert_eq!(err.category(), ErrorCategory::IOError);
    assert_eq!(err.origin(), "disconnect");
    let report = err.report();
    assert!(report.contains("DISCONNECT reply could not be received"));
    assert!(report.contains("(transport) channel disconnected"));
}
