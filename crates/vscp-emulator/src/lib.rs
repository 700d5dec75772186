//! Sensor-endpoint emulator for the VSCP protocol.
//!
//! [`Emulator`] answers every request type against an in-memory
//! [`SensorTable`], the way a board running the endpoint firmware would.
//! It can be driven directly, wrapped as a loopback [`EmulatorTransport`],
//! or attached to a byte stream with [`serve`].

pub mod emulator;
pub mod error;
pub mod serve;
pub mod sensors;
pub mod transport;

pub use emulator::{Emulator, EMULATOR_API_VERSION, EMULATOR_DB_VERSION};
pub use error::{EmulatorError, Result};
pub use sensors::{Reading, SensorRecord, SensorTable};
pub use serve::{serve, ServeSummary};
pub use transport::EmulatorTransport;
