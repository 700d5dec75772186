//! Request/response protocol toolkit for serial-attached sensor endpoints.
//!
//! A host talks to sensor endpoints with single-line query-string messages:
//!
//! ```text
//! ?type=CONNECT&id=S1&pins=5,6
//! ?id=S1&status=0&error=PinBusy
//! ```
//!
//! # Crate Structure
//!
//! - [`codec`]: wire message parsing/building and line framing
//! - [`transport`]: the `Transport` trait plus stream, socket and in-memory channels
//! - [`engine`]: the protocol engine, its error model and handshake helpers
//! - [`emulator`]: a reactive endpoint emulator (behind `emulator` feature)
//!
//! ```no_run
//! use vscp::engine::Engine;
//! use vscp::transport::{StreamConfig, UnixDomainSocket};
//!
//! let transport = UnixDomainSocket::connect_transport("/tmp/vscp.sock", StreamConfig::default())?;
//! let mut engine = Engine::new(transport);
//! engine.init("DemoApp", "1.0.0")?;
//! let readings = engine.update("sensor_001")?;
//! for (name, value) in readings.iter() {
//!     println!("{name} = {value}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export codec types.
pub mod codec {
    pub use vscp_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use vscp_transport::*;
}

/// Re-export engine types.
pub mod engine {
    pub use vscp_engine::*;
}

/// Re-export emulator types (requires `emulator` feature).
#[cfg(feature = "emulator")]
pub mod emulator {
    pub use vscp_emulator::*;
}
