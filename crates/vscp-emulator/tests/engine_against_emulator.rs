use std::sync::atomic::AtomicBool;
use std::time::Duration;

use vscp_emulator::{Emulator, EmulatorTransport, SensorTable, EMULATOR_DB_VERSION};
use vscp_engine::{Engine, EngineConfig, ErrorCategory, ParameterMap};

fn ready_engine() -> Engine<EmulatorTransport> {
    let mut engine = Engine::new(EmulatorTransport::default());
    let params = engine
        .init("Bench", EMULATOR_DB_VERSION)
        .expect("init should succeed with matching versions");
    assert_eq!(params.get("message"), Some("Initialized with Bench"));
    engine
}

#[test]
fn full_sensor_lifecycle() {
    let mut engine = ready_engine();

    let readings = engine.update("sensor_003").expect("update should succeed");
    assert_eq!(readings.get("type"), Some("BMP280"));
    assert_eq!(readings.get("Pressure"), Some("1013.25"));

    let config = ParameterMap::new().with("rate", "5");
    engine
        .config("sensor_003", &config)
        .expect("config should succeed");
    assert_eq!(
        engine
            .transport()
            .emulator()
            .stored_config("sensor_003")
            .and_then(|stored| stored.get("rate")),
        Some("5")
    );

    let connected = engine
        .connect("sensor_003", "4,5")
        .expect("connect should succeed");
    assert_eq!(connected.get("pins"), Some("4,5"));

    let err = engine
        .connect("sensor_001", "5")
        .expect_err("pin 5 is taken");
    assert_eq!(err.category(), ErrorCategory::MethodFailed);
    assert_eq!(err.message(), "Pin 5 already used by sensor sensor_003");

    let released = engine
        .disconnect("sensor_003")
        .expect("disconnect should succeed");
    assert_eq!(released.get("pins"), Some("4,5"));

    engine.reset("all").expect("reset all should succeed");
}

#[test]
fn version_mismatch_surfaces_endpoint_error() {
    let mut engine = Engine::new(EmulatorTransport::default());

    let err = engine
        .init("Bench", "0.9.0")
        .expect_err("db version mismatch should fail");

    assert_eq!(err.category(), ErrorCategory::MethodFailed);
    assert!(err.message().starts_with("Version mismatch"));
    assert!(!engine.is_initialized());
}

#[test]
fn unknown_sensor_is_method_failure() {
    let mut engine = ready_engine();

    let err = engine.update("ghost").expect_err("unknown sensor");
    assert_eq!(err.category(), ErrorCategory::MethodFailed);
    assert_eq!(err.message(), "Sensor ghost not found");
}

#[test]
fn custom_table_and_case_insensitive_engine() {
    let table = SensorTable::from_json_str(
        r#"{"sensors": [{"uid": "tank", "type": "Level",
            "readings": [{"name": "Depth", "value": 1.25}]}]}"#,
    )
    .expect("table should parse");
    let transport = EmulatorTransport::new(Emulator::new(table));
    let config = EngineConfig::default().with_case_sensitive(false);
    let mut engine = Engine::with_config(transport, config);

    engine
        .init("Bench", EMULATOR_DB_VERSION)
        .expect("init should succeed");
    let params = engine.update("tank").expect("update should succeed");
    assert_eq!(params.get("depth"), Some("1.25"));
}

#[cfg(unix)]
#[test]
fn engine_over_socket_pair() {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use vscp_emulator::serve;
    use vscp_transport::{StreamConfig, StreamTransport};

    let (server_side, client_side) = UnixStream::pair().expect("socket pair should open");

    let server = thread::spawn(move || {
        let mut emulator = Emulator::default();
        let mut transport = StreamTransport::with_config(server_side, StreamConfig::serving());
        let running = AtomicBool::new(true);
        serve(
            &mut emulator,
            &mut transport,
            &running,
            Duration::from_millis(20),
        )
        .expect("serve should end cleanly")
    });

    let config = EngineConfig::default().with_receive_timeout(Duration::from_secs(2));
    let mut engine = Engine::with_config(StreamTransport::new(client_side), config);
    engine
        .init("Bench", EMULATOR_DB_VERSION)
        .expect("init should succeed");
    let readings = engine.update("sensor_004").expect("update should succeed");
    assert_eq!(readings.get("Button"), Some("0"));

    drop(engine);
    let summary = server.join().expect("server thread should finish");
    assert_eq!(summary.requests, 2);
}
