//! Byte-transport abstraction for the VSCP sensor protocol.
//!
//! The protocol engine only needs three capabilities from a channel:
//! initialize it, send one message, and receive one message within a
//! timeout. [`Transport`] captures exactly that. Implementations here:
//! - [`StreamTransport`]: newline-framed messages over any blocking byte
//!   stream that supports read timeouts (serial bridges, sockets)
//! - [`MemoryTransport`]: scripted in-memory stub for tests
//! - [`UnixDomainSocket`]: socket plumbing used by the CLI and emulator

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::{StreamConfig, StreamTransport};
pub use traits::{TimeoutStream, Transport};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
