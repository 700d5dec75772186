use std::fmt;
use std::str::FromStr;

use vscp_codec::ParameterMap;

use crate::error::{ProtocolError, Result};

/// Outcome of one protocol operation: the reply's parameters or a failure.
pub type OperationResult = std::result::Result<ParameterMap, ProtocolError>;

/// Characters a UID may not contain, since it travels as a wire value.
const UID_FORBIDDEN: &[char] = &['&', '=', '?', '\r', '\n'];

/// Identifier of a sensor endpoint.
///
/// Non-empty and free of wire-reserved characters. Endpoints echo it in
/// every scoped reply so desynchronized replies can be detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorUid(String);

impl SensorUid {
    pub fn new(uid: impl Into<String>) -> Result<Self> {
        let uid = uid.into();
        if uid.is_empty() {
            return Err(ProtocolError::invalid_value(
                "sensor_uid",
                "sensor UID must not be empty",
            ));
        }
        if let Some(ch) = uid.chars().find(|ch| UID_FORBIDDEN.contains(ch)) {
            return Err(ProtocolError::invalid_value(
                "sensor_uid",
                format!("sensor UID '{}' contains reserved character {ch:?}", uid.escape_debug()),
            ));
        }
        Ok(Self(uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SensorUid {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for SensorUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of hardware pins, serialized as `5,6,7`.
///
/// Order and duplicates are kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinSpecification(Vec<u32>);

impl PinSpecification {
    pub fn new(pins: Vec<u32>) -> Result<Self> {
        if pins.is_empty() {
            return Err(ProtocolError::invalid_value(
                "pins",
                "pin list must not be empty",
            ));
        }
        Ok(Self(pins))
    }

    pub fn pins(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PinSpecification {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(ProtocolError::invalid_value(
                "pins",
                "pin list must not be empty",
            ));
        }

        let pins = s
            .split(',')
            .map(|item| {
                let item = item.trim();
                item.parse::<u32>().map_err(|_| {
                    ProtocolError::invalid_value(
                        "pins",
                        format!("invalid pin '{item}' in '{s}' (expected a non-negative integer)"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(pins)
    }
}

impl fmt::Display for PinSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, pin) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{pin}")?;
        }
        Ok(())
    }
}

/// Handshake state of an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Initialized {
        negotiated_api_version: String,
        db_version: String,
    },
}

impl EngineState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, EngineState::Initialized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn uid_rejects_empty_and_reserved() {
        assert_eq!(
            SensorUid::new("").unwrap_err().category(),
            ErrorCategory::InvalidValue
        );
        assert!(SensorUid::new("S1&type=RESET").is_err());
        assert!(SensorUid::new("S1\n").is_err());
        assert_eq!(SensorUid::new("sensor_001").unwrap().as_str(), "sensor_001");
    }

    #[test]
    fn pins_parse_in_order_with_duplicates() {
        let pins: PinSpecification = "5, 6,5".parse().unwrap();
        assert_eq!(pins.pins(), &[5, 6, 5]);
        assert_eq!(pins.to_string(), "5,6,5");
    }

    #[test]
    fn pins_reject_empty_and_negative() {
        let empty = "".parse::<PinSpecification>().unwrap_err();
        assert_eq!(empty.category(), ErrorCategory::InvalidValue);

        assert!("5,-1".parse::<PinSpecification>().is_err());
        assert!("5,,6".parse::<PinSpecification>().is_err());
        assert!(PinSpecification::new(Vec::new()).is_err());
    }

    #[test]
    fn state_defaults_to_uninitialized() {
        assert_eq!(EngineState::default(), EngineState::Uninitialized);
        assert!(!EngineState::default().is_initialized());
    }
}
