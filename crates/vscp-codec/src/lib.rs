//! Wire codec for the VSCP sensor protocol.
//!
//! Messages are URL-query-style strings exchanged one per line:
//!
//! ```text
//! ?type=UPDATE&id=sensor_001
//! ?id=sensor_001&status=1&Temperature=25.5
//! ```
//!
//! This crate is pure: it converts between wire strings and an ordered
//! [`ParameterMap`], and splits a byte stream into lines. No I/O, no state.

pub mod error;
pub mod line;
pub mod message;
pub mod params;

pub use error::{CodecError, Result};
pub use line::{decode_line, encode_line, LINE_TERMINATOR};
pub use message::{
    build, build_with_limit, find_folded_duplicate, find_reserved, parse, CodecConfig,
    MAX_REQUEST_SIZE, QUERY_MARKER,
};
pub use params::ParameterMap;
