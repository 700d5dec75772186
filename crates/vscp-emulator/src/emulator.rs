use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use vscp_codec::{build, parse, ParameterMap};
use vscp_engine::request::{
    KEY_API, KEY_APP, KEY_DB, KEY_ERROR, KEY_ID, KEY_PINS, KEY_STATUS, KEY_TYPE, STATUS_FAILED,
    STATUS_OK,
};
use vscp_engine::{PinSpecification, RequestKind};

use crate::sensors::SensorTable;

/// API version the emulated firmware accepts.
pub const EMULATOR_API_VERSION: &str = "1.2";

/// Database version the emulated firmware accepts.
pub const EMULATOR_DB_VERSION: &str = "1.0.0";

const RESET_ALL: &str = "all";
const FALLBACK_REPLY: &str = "?status=0&error=Reply too large";

/// Reactive endpoint that answers protocol requests.
///
/// State lives for the emulator's lifetime, across client connections,
/// like a board that stays powered while hosts come and go.
#[derive(Debug)]
pub struct Emulator {
    api_version: String,
    db_version: String,
    sensors: SensorTable,
    initialized: bool,
    configs: BTreeMap<String, ParameterMap>,
    connections: BTreeMap<String, PinSpecification>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(SensorTable::default())
    }
}

impl Emulator {
    pub fn new(sensors: SensorTable) -> Self {
        Self {
            api_version: EMULATOR_API_VERSION.to_string(),
            db_version: EMULATOR_DB_VERSION.to_string(),
            sensors,
            initialized: false,
            configs: BTreeMap::new(),
            connections: BTreeMap::new(),
        }
    }

    /// Override the versions INIT must present.
    pub fn with_versions(mut self, api: impl Into<String>, db: impl Into<String>) -> Self {
        self.api_version = api.into();
        self.db_version = db.into();
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn sensors(&self) -> &SensorTable {
        &self.sensors
    }

    /// Configuration last stored for `uid` by CONFIG.
    pub fn stored_config(&self, uid: &str) -> Option<&ParameterMap> {
        self.configs.get(uid)
    }

    /// Pins `uid` is connected to.
    pub fn connection(&self, uid: &str) -> Option<&PinSpecification> {
        self.connections.get(uid)
    }

    /// Answer one wire request with one wire reply.
    pub fn handle(&mut self, request: &str) -> String {
        let params = parse(request.trim(), true);
        let type_name = params.get(KEY_TYPE).unwrap_or_default().to_ascii_uppercase();
        debug!(request = request.trim(), "emulator request");

        let reply = match type_name.parse::<RequestKind>() {
            Ok(RequestKind::Init) => self.handle_init(&params),
            Ok(_) if !self.initialized => {
                let mut reply = ParameterMap::new();
                if let Some(uid) = params.get(KEY_ID) {
                    reply.insert(KEY_ID, uid);
                }
                failure(reply, "Protocol not initialized")
            }
            Ok(RequestKind::Update) => self.handle_update(&params),
            Ok(RequestKind::Config) => self.handle_config(&params),
            Ok(RequestKind::Reset) => self.handle_reset(&params),
            Ok(RequestKind::Connect) => self.handle_connect(&params),
            Ok(RequestKind::Disconnect) => self.handle_disconnect(&params),
            Err(_) => failure(
                ParameterMap::new(),
                format!("Unknown request type: {type_name}"),
            ),
        };

        match build(&reply) {
            Ok(message) => {
                debug!(reply = %message, "emulator reply");
                message
            }
            Err(err) => {
                warn!(error = %err, "emulator reply could not be built");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    fn handle_init(&mut self, params: &ParameterMap) -> ParameterMap {
        let app = params.get(KEY_APP).unwrap_or("Unknown");
        let db = params.get(KEY_DB).unwrap_or("0.0.0");
        let api = params.get(KEY_API).unwrap_or("0.0.0");

        if api == self.api_version && db == self.db_version {
            self.initialized = true;
            info!(app, "emulator initialized");
            ParameterMap::new()
                .with(KEY_STATUS, STATUS_OK)
                .with("message", format!("Initialized with {app}"))
        } else {
            warn!(api, db, "version mismatch");
            failure(
                ParameterMap::new(),
                format!(
                    "Version mismatch - API:{api} (need {}), DB:{db} (need {})",
                    self.api_version, self.db_version
                ),
            )
        }
    }

    fn handle_update(&self, params: &ParameterMap) -> ParameterMap {
        let uid = params.get(KEY_ID).unwrap_or_default();
        let reply = scoped(uid);

        match self.sensors.get(uid) {
            Some(sensor) => {
                let mut reply = reply.with(KEY_STATUS, STATUS_OK).with(KEY_TYPE, &sensor.kind);
                for reading in &sensor.readings {
                    reply.insert(reading.name.as_str(), reading.value_text());
                }
                reply
            }
            None => failure(reply, format!("Sensor {uid} not found")),
        }
    }

    fn handle_config(&mut self, params: &ParameterMap) -> ParameterMap {
        let uid = params.get(KEY_ID).unwrap_or_default();
        let reply = scoped(uid);
        if uid.is_empty() {
            return failure(reply, "Invalid sensor ID");
        }

        let stored: ParameterMap = params
            .iter()
            .filter(|(key, _)| *key != KEY_TYPE && *key != KEY_ID)
            .collect();
        let count = stored.len();
        debug!(uid, parameters = count, "sensor configured");
        self.configs.insert(uid.to_string(), stored);

        reply
            .with(KEY_STATUS, STATUS_OK)
            .with("message", format!("Configuration applied: {count} parameters"))
    }

    fn handle_reset(&mut self, params: &ParameterMap) -> ParameterMap {
        let uid = params.get(KEY_ID).unwrap_or_default();
        let reply = scoped(uid);

        if uid == RESET_ALL {
            self.configs.clear();
            self.connections.clear();
            debug!("all sensors reset");
        } else if self.sensors.contains(uid) {
            self.configs.remove(uid);
            self.connections.remove(uid);
            debug!(uid, "sensor reset");
        } else {
            return failure(reply, format!("Sensor {uid} not found"));
        }

        reply.with(KEY_STATUS, STATUS_OK)
    }

    fn handle_connect(&mut self, params: &ParameterMap) -> ParameterMap {
        let uid = params.get(KEY_ID).unwrap_or_default();
        let pins = params.get(KEY_PINS).unwrap_or_default();
        let reply = scoped(uid);

        if uid.is_empty() || pins.is_empty() {
            return failure(reply, "Missing sensor ID or pin list");
        }
        let pins: PinSpecification = match pins.parse() {
            Ok(pins) => pins,
            Err(_) => return failure(reply, format!("Invalid pin list: {pins}")),
        };

        let conflict = pins.pins().iter().find_map(|pin| {
            self.connections
                .iter()
                .find(|(other, used)| other.as_str() != uid && used.pins().contains(pin))
                .map(|(other, _)| (*pin, other.clone()))
        });
        if let Some((pin, other)) = conflict {
            return failure(reply, format!("Pin {pin} already used by sensor {other}"));
        }

        let text = pins.to_string();
        self.connections.insert(uid.to_string(), pins);
        debug!(uid, pins = %text, "sensor connected");
        reply.with(KEY_STATUS, STATUS_OK).with(KEY_PINS, text)
    }

    fn handle_disconnect(&mut self, params: &ParameterMap) -> ParameterMap {
        let uid = params.get(KEY_ID).unwrap_or_default();
        let reply = scoped(uid);

        match self.connections.remove(uid) {
            Some(pins) => {
                debug!(uid, pins = %pins, "sensor disconnected");
                reply
                    .with(KEY_STATUS, STATUS_OK)
                    .with(KEY_PINS, pins.to_string())
            }
            None => failure(reply, format!("Sensor {uid} not connected")),
        }
    }
}

fn scoped(uid: &str) -> ParameterMap {
    ParameterMap::new().with(KEY_ID, uid)
}

fn failure(reply: ParameterMap, error: impl Into<String>) -> ParameterMap {
    reply
        .with(KEY_STATUS, STATUS_FAILED)
        .with(KEY_ERROR, error.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> Emulator {
        let mut emulator = Emulator::default();
        let reply = emulator.handle("?type=INIT&app=Bench&db=1.0.0&api=1.2");
        assert_eq!(reply, "?status=1&message=Initialized with Bench");
        emulator
    }

    #[test]
    fn init_requires_matching_versions() {
        let mut emulator = Emulator::default();
        let reply = emulator.handle("?type=INIT&app=Bench&db=1.0&api=1.2");
        assert_eq!(
            reply,
            "?status=0&error=Version mismatch - API:1.2 (need 1.2), DB:1.0 (need 1.0.0)"
        );
        assert!(!emulator.is_initialized());
    }

    #[test]
    fn requests_before_init_are_refused() {
        let mut emulator = Emulator::default();
        assert_eq!(
            emulator.handle("?type=UPDATE&id=sensor_001"),
            "?id=sensor_001&status=0&error=Protocol not initialized"
        );
    }

    #[test]
    fn update_reports_type_and_readings() {
        let mut emulator = ready();
        assert_eq!(
            emulator.handle("?type=UPDATE&id=sensor_001\r\n"),
            "?id=sensor_001&status=1&type=DHT22&Temperature=25.5&Humidity=60.2"
        );
        assert_eq!(
            emulator.handle("?type=update&id=ghost"),
            "?id=ghost&status=0&error=Sensor ghost not found"
        );
    }

    #[test]
    fn config_stores_parameters() {
        let mut emulator = ready();
        let reply = emulator.handle("?type=CONFIG&id=sensor_002&rate=10&unit=cm");
        assert!(reply.starts_with("?id=sensor_002&status=1"));

        let stored = emulator.stored_config("sensor_002").unwrap();
        assert_eq!(stored.get("rate"), Some("10"));
        assert!(!stored.contains_key("type"));
    }

    #[test]
    fn connect_detects_pin_conflicts() {
        let mut emulator = ready();
        assert_eq!(
            emulator.handle("?type=CONNECT&id=sensor_001&pins=5,6"),
            "?id=sensor_001&status=1&pins=5,6"
        );
        assert_eq!(
            emulator.handle("?type=CONNECT&id=sensor_002&pins=7,6"),
            "?id=sensor_002&status=0&error=Pin 6 already used by sensor sensor_001"
        );
        assert!(emulator
            .handle("?type=CONNECT&id=sensor_002&pins=x")
            .contains("Invalid pin list"));
    }

    #[test]
    fn disconnect_and_reset() {
        let mut emulator = ready();
        emulator.handle("?type=CONNECT&id=sensor_001&pins=5");
        assert_eq!(
            emulator.handle("?type=DISCONNECT&id=sensor_001"),
            "?id=sensor_001&status=1&pins=5"
        );
        assert_eq!(
            emulator.handle("?type=DISCONNECT&id=sensor_001"),
            "?id=sensor_001&status=0&error=Sensor sensor_001 not connected"
        );

        emulator.handle("?type=CONNECT&id=sensor_003&pins=9");
        assert_eq!(emulator.handle("?type=RESET&id=all"), "?id=all&status=1");
        assert!(emulator.connection("sensor_003").is_none());
    }

    #[test]
    fn unknown_type_is_reported() {
        let mut emulator = ready();
        assert_eq!(
            emulator.handle("?type=PING"),
            "?status=0&error=Unknown request type: PING"
        );
    }
}
