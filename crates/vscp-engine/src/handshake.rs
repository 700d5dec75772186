//! API version helpers for the INIT exchange.
//!
//! The engine itself never rejects a handshake on version grounds; callers
//! that want a strict policy apply one of these to the returned parameters.

use vscp_codec::ParameterMap;

use crate::error::{ProtocolError, Result};
use crate::request::KEY_API;

/// The API version an endpoint reported in its INIT reply.
pub fn remote_api_version(params: &ParameterMap) -> Result<&str> {
    params.get(KEY_API).ok_or_else(|| {
        ProtocolError::not_found("handshake", "endpoint did not report an api version")
    })
}

/// Exact-match comparison of two API version strings.
pub fn api_versions_match(local: &str, remote: &str) -> bool {
    local == remote
}

/// Fail with `MethodFailed` unless the reported version equals `local`.
pub fn require_api_match(local: &str, params: &ParameterMap) -> Result<()> {
    let remote = remote_api_version(params)?;
    if api_versions_match(local, remote) {
        Ok(())
    } else {
        Err(ProtocolError::method_failed(
            "handshake",
            format!("api version mismatch: local {local}, endpoint {remote}"),
        ))
    }
}
