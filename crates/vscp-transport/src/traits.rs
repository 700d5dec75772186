use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A message channel between the host and a sensor endpoint.
///
/// Implementations own the platform details (line rate, pins, sockets).
/// The protocol engine is handed one at construction and never inspects
/// which kind it got.
pub trait Transport {
    /// Establish the underlying channel.
    ///
    /// Must be idempotent and must finish, or fail with
    /// [`TransportError::Timeout`](crate::TransportError::Timeout), within
    /// `timeout`.
    fn initialize(&mut self, timeout: Duration) -> Result<()>;

    /// Send one complete message (best effort).
    fn send(&mut self, message: &str) -> Result<()>;

    /// Block until one complete message arrives or `timeout` elapses.
    ///
    /// Returns [`TransportError::Timeout`](crate::TransportError::Timeout)
    /// rather than an empty or partial message when nothing complete arrived.
    fn receive(&mut self, timeout: Duration) -> Result<String>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        (**self).initialize(timeout)
    }

    fn send(&mut self, message: &str) -> Result<()> {
        (**self).send(message)
    }

    fn receive(&mut self, timeout: Duration) -> Result<String> {
        (**self).receive(timeout)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        (**self).initialize(timeout)
    }

    fn send(&mut self, message: &str) -> Result<()> {
        (**self).send(message)
    }

    fn receive(&mut self, timeout: Duration) -> Result<String> {
        (**self).receive(timeout)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// A blocking byte stream whose reads and writes can be bounded in time.
pub trait TimeoutStream: Read + Write {
    /// Set read timeout on the underlying stream.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Set write timeout on the underlying stream.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;
}

impl TimeoutStream for std::net::TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_write_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl TimeoutStream for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout)
    }
}
