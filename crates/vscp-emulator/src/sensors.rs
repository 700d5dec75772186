use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vscp_codec::find_reserved;
use vscp_engine::SensorUid;

use crate::error::{EmulatorError, Result};

/// Upper bound on a sensor table file, in bytes.
const MAX_TABLE_FILE_SIZE: u64 = 1024 * 1024;

/// One named reading of a sensor. The value may be a JSON string, number
/// or boolean; it is reported on the wire as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub value: Value,
}

impl Reading {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Wire text of the value.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            other => other.to_string(),
        }
    }
}

/// A sensor the emulator answers for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub uid: String,
    /// Hardware type reported as the `type` reply key.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl SensorRecord {
    pub fn new(uid: impl Into<String>, kind: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            uid: uid.into(),
            kind: kind.into(),
            readings,
        }
    }
}

/// Ordered set of emulated sensors.
///
/// JSON form:
///
/// ```json
/// {"sensors": [{"uid": "sensor_005", "type": "Light",
///               "readings": [{"name": "Lux", "value": 350}]}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    pub sensors: Vec<SensorRecord>,
}

impl SensorTable {
    /// Build a table, rejecting duplicate UIDs and text that cannot be sent
    /// on the wire unescaped.
    pub fn new(sensors: Vec<SensorRecord>) -> Result<Self> {
        let table = Self { sensors };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: SensorTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let read_err = |source| EmulatorError::Read {
            path: path.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(path).map_err(read_err)?;
        if metadata.len() > MAX_TABLE_FILE_SIZE {
            return Err(EmulatorError::InvalidTable(format!(
                "{} is {} bytes (max {MAX_TABLE_FILE_SIZE})",
                path.display(),
                metadata.len()
            )));
        }

        let json = std::fs::read_to_string(path).map_err(read_err)?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, uid: &str) -> Option<&SensorRecord> {
        self.sensors.iter().find(|sensor| sensor.uid == uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.get(uid).is_some()
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(|sensor| sensor.uid.as_str())
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            SensorUid::new(sensor.uid.as_str())
                .map_err(|err| EmulatorError::InvalidTable(err.to_string()))?;
            if sensor.uid == "all" {
                return Err(EmulatorError::InvalidTable(
                    "'all' is reserved for RESET and cannot name a sensor".to_string(),
                ));
            }
            if !seen.insert(sensor.uid.as_str()) {
                return Err(EmulatorError::InvalidTable(format!(
                    "duplicate sensor uid '{}'",
                    sensor.uid
                )));
            }

            check_text(&sensor.uid, "type", &sensor.kind)?;
            for reading in &sensor.readings {
                if reading.name.is_empty() {
                    return Err(EmulatorError::InvalidTable(format!(
                        "sensor '{}' has a reading without a name",
                        sensor.uid
                    )));
                }
                check_text(&sensor.uid, "reading name", &reading.name)?;
                check_text(&sensor.uid, "reading value", &reading.value_text())?;
            }
        }
        Ok(())
    }
}

fn check_text(uid: &str, field: &str, text: &str) -> Result<()> {
    match find_reserved(text) {
        Some(ch) => Err(EmulatorError::InvalidTable(format!(
            "sensor '{uid}' {field} '{}' contains reserved character {ch:?}",
            text.escape_debug()
        ))),
        None => Ok(()),
    }
}

impl Default for SensorTable {
    /// The bench set the endpoint firmware ships with.
    fn default() -> Self {
        let sensor = |uid: &str, kind: &str, readings: &[(&str, Value)]| {
            SensorRecord::new(
                uid,
                kind,
                readings
                    .iter()
                    .map(|(name, value)| Reading::new(*name, value.clone()))
                    .collect(),
            )
        };

        Self {
            sensors: vec![
                sensor(
                    "sensor_001",
                    "DHT22",
                    &[("Temperature", Value::from(25.5)), ("Humidity", Value::from(60.2))],
                ),
                sensor("sensor_002", "Ultrasonic", &[("Distance", Value::from(150))]),
                sensor(
                    "sensor_003",
                    "BMP280",
                    &[("Pressure", Value::from(1013.25)), ("Temperature", Value::from(22.1))],
                ),
                sensor(
                    "sensor_004",
                    "Joystick",
                    &[("X", Value::from(45)), ("Y", Value::from(78)), ("Button", Value::from(0))],
                ),
                sensor("sensor_005", "Light", &[("Lux", Value::from(350))]),
                sensor(
                    "sensor_006",
                    "Magnetic",
                    &[("MagField", Value::from(12.5)), ("Detected", Value::from(0))],
                ),
                sensor(
                    "imu_001",
                    "IMU",
                    &[
                        ("acm_x", Value::from(-2.1)),
                        ("acm_y", Value::from(0.8)),
                        ("acm_z", Value::from(9.8)),
                        ("gyr_x", Value::from(0.05)),
                        ("gyr_y", Value::from(-0.02)),
                        ("gyr_z", Value::from(0.01)),
                    ],
                ),
            ],
        }
    }
}
