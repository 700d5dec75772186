use std::io::ErrorKind;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, trace};
use vscp_codec::{decode_line, encode_line, CodecError, MAX_REQUEST_SIZE};

use crate::error::{Result, TransportError};
use crate::traits::{TimeoutStream, Transport};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;
const READ_CHUNK_SIZE: usize = 512;
/// Read timeout used while draining stale input; zero is not a valid timeout.
const DRAIN_POLL: Duration = Duration::from_millis(1);
/// Upper bound on bytes discarded before one request.
const MAX_DRAIN_BYTES: usize = 64 * 1024;

/// Configuration for a [`StreamTransport`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum line length in bytes, terminator excluded. Default: 1024.
    pub max_line_len: usize,
    /// Write timeout applied at initialization. `None` uses the init window.
    pub write_timeout: Option<Duration>,
    /// Discard unread input before each send. Default: true.
    ///
    /// A reply that arrives after its request timed out would otherwise be
    /// taken as the reply to the next request. Serving ends, which read
    /// requests rather than replies, turn this off.
    pub discard_stale_input: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_len: MAX_REQUEST_SIZE,
            write_timeout: None,
            discard_stale_input: true,
        }
    }
}

impl StreamConfig {
    /// Configuration for the answering side of a channel.
    pub fn serving() -> Self {
        Self {
            discard_stale_input: false,
            ..Self::default()
        }
    }
}

/// Newline-framed message transport over a blocking byte stream.
///
/// Each [`send`](Transport::send) writes one line; each
/// [`receive`](Transport::receive) returns one line, buffering any extra
/// bytes that arrived with it for the next call.
pub struct StreamTransport<S> {
    stream: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
    config: StreamConfig,
    initialized: bool,
}

impl<S: TimeoutStream> StreamTransport<S> {
    /// Wrap a stream with default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, StreamConfig::default())
    }

    /// Wrap a stream with explicit configuration.
    pub fn with_config(stream: S, config: StreamConfig) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            initialized: false,
        }
    }

    /// Whether [`initialize`](Transport::initialize) has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Current transport configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn write_all_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.write_buf.len() {
            match self.stream.write(&self.write_buf[offset..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_disconnect(err.kind()) => return Err(TransportError::Disconnected),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// Drop buffered bytes and anything already readable from the stream.
    fn discard_stale_input(&mut self) -> Result<()> {
        let mut discarded = self.read_buf.len();
        self.read_buf.clear();
        self.stream.set_read_timeout(Some(DRAIN_POLL))?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while discarded < MAX_DRAIN_BYTES {
            match self.stream.read(&mut chunk) {
                // EOF is reported by the next receive.
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break
                }
                Err(err) if is_disconnect(err.kind()) => return Err(TransportError::Disconnected),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        if discarded > 0 {
            debug!(bytes = discarded, "discarded stale input before send");
        }
        Ok(())
    }

    fn next_buffered_line(&mut self) -> Result<Option<String>> {
        decode_line(&mut self.read_buf, self.config.max_line_len).map_err(|err| match err {
            CodecError::LineTooLong { len, max } => TransportError::MessageTooLarge { len, max },
            other => TransportError::Other(other.to_string()),
        })
    }
}

impl<S: TimeoutStream> Transport for StreamTransport<S> {
    fn initialize(&mut self, timeout: Duration) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let started = Instant::now();
        let write_timeout = self.config.write_timeout.unwrap_or(timeout);
        self.stream
            .set_write_timeout(Some(write_timeout))
            .map_err(|err| TransportError::NotReady(format!("cannot set write timeout: {err}")))?;

        if started.elapsed() > timeout {
            return Err(TransportError::Timeout(timeout));
        }

        self.initialized = true;
        debug!(?write_timeout, "stream transport initialized");
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<()> {
        if !self.initialized {
            return Err(TransportError::NotReady(
                "stream transport not initialized".to_string(),
            ));
        }
        if message.len() > self.config.max_line_len {
            return Err(TransportError::MessageTooLarge {
                len: message.len(),
                max: self.config.max_line_len,
            });
        }

        if self.config.discard_stale_input {
            self.discard_stale_input()?;
        }

        self.write_buf.clear();
        encode_line(message, &mut self.write_buf);
        self.write_all_buffered()?;
        trace!(line = message, "line sent");
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<String> {
        if !self.initialized {
            return Err(TransportError::NotReady(
                "stream transport not initialized".to_string(),
            ));
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.next_buffered_line()? {
                trace!(line = %line, "line received");
                return Ok(line);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }
            self.stream.set_read_timeout(Some(remaining))?;

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(err) if is_disconnect(err.kind()) => return Err(TransportError::Disconnected),
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                return Err(TransportError::Disconnected);
            }

            self.read_buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn name(&self) -> &'static str {
        "stream"
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("buffered", &self.read_buf.len())
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .finish()
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
