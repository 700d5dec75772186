//! Line framing for byte-stream transports.
//!
//! One message per line:
//! ```text
//! ?type=RESET&id=S1\n
//! ```
//! Outgoing lines end with `\n`. Incoming lines may end with `\n` or `\r\n`;
//! blank lines are skipped.

use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::{CodecError, Result};

/// Byte terminating every line on the wire.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Append `message` plus the line terminator to `dst`.
pub fn encode_line(message: &str, dst: &mut BytesMut) {
    dst.reserve(message.len() + 1);
    dst.put_slice(message.as_bytes());
    dst.put_u8(LINE_TERMINATOR);
}

/// Decode the next complete line from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete non-blank line
/// yet. On success, consumes the line and its terminator from the buffer.
/// A line (or an unterminated tail) longer than `max_len` is discarded and
/// reported as [`CodecError::LineTooLong`].
pub fn decode_line(src: &mut BytesMut, max_len: usize) -> Result<Option<String>> {
    loop {
        let Some(end) = src.iter().position(|&b| b == LINE_TERMINATOR) else {
            // A trailing `\r` may belong to a `\r\n` still in flight.
            let pending = usize::from(src.last() == Some(&b'\r'));
            if src.len() > max_len + pending {
                let len = src.len();
                src.clear();
                return Err(CodecError::LineTooLong { len, max: max_len });
            }
            return Ok(None);
        };

        let mut line = src.split_to(end);
        src.advance(1);

        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        if line.is_empty() {
            trace!("skipping blank line");
            continue;
        }

        if line.len() > max_len {
            return Err(CodecError::LineTooLong {
                len: line.len(),
                max: max_len,
            });
        }

        return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
    }
}
