use std::fmt;
use std::str::FromStr;

use tracing::warn;
use vscp_codec::ParameterMap;

use crate::error::ProtocolError;
use crate::types::{OperationResult, SensorUid};

pub const KEY_TYPE: &str = "type";
pub const KEY_ID: &str = "id";
pub const KEY_STATUS: &str = "status";
pub const KEY_ERROR: &str = "error";
pub const KEY_APP: &str = "app";
pub const KEY_DB: &str = "db";
pub const KEY_API: &str = "api";
pub const KEY_PINS: &str = "pins";

pub const STATUS_OK: &str = "1";
pub const STATUS_FAILED: &str = "0";

/// The six request types of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Init,
    Update,
    Config,
    Reset,
    Connect,
    Disconnect,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        RequestKind::Init,
        RequestKind::Update,
        RequestKind::Config,
        RequestKind::Reset,
        RequestKind::Connect,
        RequestKind::Disconnect,
    ];

    /// Wire value of the `type` key.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Init => "INIT",
            RequestKind::Update => "UPDATE",
            RequestKind::Config => "CONFIG",
            RequestKind::Reset => "RESET",
            RequestKind::Connect => "CONNECT",
            RequestKind::Disconnect => "DISCONNECT",
        }
    }

    /// Origin label used for errors raised by this operation.
    pub fn origin(self) -> &'static str {
        match self {
            RequestKind::Init => "init",
            RequestKind::Update => "update",
            RequestKind::Config => "config",
            RequestKind::Reset => "reset",
            RequestKind::Connect => "connect",
            RequestKind::Disconnect => "disconnect",
        }
    }

    /// Whether requests carry an `id` the reply must echo.
    pub fn is_uid_scoped(self) -> bool {
        !matches!(self, RequestKind::Init)
    }

    /// Start a request map with `type` (and `id` when scoped) filled in.
    pub(crate) fn start(self, uid: Option<&SensorUid>) -> ParameterMap {
        let mut params = ParameterMap::with_capacity(4);
        params.insert(KEY_TYPE, self.as_str());
        if let Some(uid) = uid {
            params.insert(KEY_ID, uid.as_str());
        }
        params
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ProtocolError::invalid_value("request", format!("unknown request type '{s}'"))
            })
    }
}

/// Turn a parsed reply into the operation's result.
///
/// For UID-scoped requests the reply `id` is checked first: a missing or
/// different id is a desynchronized reply and fails with `MethodFailed`
/// whatever its status says. Then `status` must be `"1"` or `"0"`; anything
/// else (including no status at all) is a malformed reply. `status` and
/// `id` are stripped from a successful result; other keys pass through.
pub fn interpret_reply(
    kind: RequestKind,
    expected_uid: Option<&SensorUid>,
    mut reply: ParameterMap,
) -> OperationResult {
    let origin = kind.origin();

    if let Some(expected) = expected_uid {
        match reply.remove(KEY_ID) {
            Some(id) if id == expected.as_str() => {}
            Some(id) => {
                warn!(%kind, expected = %expected, received = %id, "reply for another sensor");
                return Err(ProtocolError::method_failed(
                    origin,
                    format!("reply id '{id}' does not match request id '{expected}'"),
                ));
            }
            None => {
                warn!(%kind, expected = %expected, "reply without id");
                return Err(ProtocolError::method_failed(
                    origin,
                    format!("{kind} reply carries no id (expected '{expected}')"),
                ));
            }
        }
    }

    let status = reply.remove(KEY_STATUS).ok_or_else(|| {
        ProtocolError::encoding(origin, format!("{kind} reply has no status field"))
    })?;

    match status.as_str() {
        STATUS_OK => Ok(reply),
        STATUS_FAILED => {
            let message = reply
                .remove(KEY_ERROR)
                .filter(|msg| !msg.is_empty())
                .unwrap_or_else(|| format!("{kind} rejected by endpoint"));
            warn!(%kind, error = %message, "endpoint reported failure");
            Err(ProtocolError::method_failed(origin, message))
        }
        other => Err(ProtocolError::encoding(
            origin,
            format!("{kind} reply has invalid status '{other}'"),
        )),
    }
}
