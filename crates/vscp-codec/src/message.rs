use crate::error::{CodecError, Result};
use crate::params::ParameterMap;

/// Default maximum size of a single wire message in bytes.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Framing marker that starts every message.
pub const QUERY_MARKER: char = '?';

const PAIR_SEPARATOR: char = '&';
const KEY_VALUE_SEPARATOR: char = '=';

/// Codec settings shared by both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum size of a built message in bytes. Default: 1024.
    pub max_message_size: usize,
    /// Whether keys are matched case-sensitively. Default: true.
    pub case_sensitive: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_REQUEST_SIZE,
            case_sensitive: true,
        }
    }
}

impl CodecConfig {
    /// Parse a wire message with this config's case sensitivity.
    pub fn parse(&self, raw: &str) -> ParameterMap {
        parse(raw, self.case_sensitive)
    }

    /// Build a wire message bounded by this config's size limit.
    ///
    /// In case-insensitive mode, keys that differ only in case are rejected:
    /// the receiver would fold them into one.
    pub fn build(&self, params: &ParameterMap) -> Result<String> {
        if !self.case_sensitive {
            if let Some(key) = find_folded_duplicate(params) {
                return Err(CodecError::DuplicateKey(key.to_string()));
            }
        }
        build_with_limit(params, self.max_message_size)
    }
}

/// Returns the first key that collides with an earlier one once both are
/// lowercased.
pub fn find_folded_duplicate(params: &ParameterMap) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(params.len());
    params
        .keys()
        .find(|key| !seen.insert(key.to_lowercase()))
}

/// Parse a wire message into ordered parameters.
///
/// Parsing is permissive: a missing `?` marker, empty tokens and tokens
/// without `=` are accepted. A token without `=` becomes a key with an empty
/// value. When `case_sensitive` is false keys are lowercased and a later
/// duplicate overwrites an earlier one (last write wins).
pub fn parse(raw: &str, case_sensitive: bool) -> ParameterMap {
    let body = raw.strip_prefix(QUERY_MARKER).unwrap_or(raw);
    let mut params = ParameterMap::new();

    for token in body.split(PAIR_SEPARATOR) {
        if token.is_empty() {
            continue;
        }

        let (key, value) = token
            .split_once(KEY_VALUE_SEPARATOR)
            .unwrap_or((token, ""));

        if case_sensitive {
            params.insert(key, value);
        } else {
            params.insert(key.to_lowercase(), value);
        }
    }

    params
}

/// Build a wire message using [`MAX_REQUEST_SIZE`] as the limit.
pub fn build(params: &ParameterMap) -> Result<String> {
    build_with_limit(params, MAX_REQUEST_SIZE)
}

/// Build a wire message, failing if it would exceed `max_size` bytes.
///
/// Keys must be non-empty. Neither keys nor values may contain `&`, `=`,
/// `\r` or `\n`; such input is rejected rather than escaped.
pub fn build_with_limit(params: &ParameterMap, max_size: usize) -> Result<String> {
    let mut out = String::with_capacity(64);
    out.push(QUERY_MARKER);

    for (idx, (key, value)) in params.iter().enumerate() {
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }
        check_reserved("key", key)?;
        check_reserved("value", value)?;

        if idx > 0 {
            out.push(PAIR_SEPARATOR);
        }
        out.push_str(key);
        out.push(KEY_VALUE_SEPARATOR);
        out.push_str(value);
    }

    if out.len() > max_size {
        return Err(CodecError::MessageTooLarge {
            size: out.len(),
            max: max_size,
        });
    }

    Ok(out)
}

/// Returns the first wire-reserved character in `text`, if any.
pub fn find_reserved(text: &str) -> Option<char> {
    text.chars()
        .find(|&ch| matches!(ch, PAIR_SEPARATOR | KEY_VALUE_SEPARATOR | '\r' | '\n'))
}

fn check_reserved(field: &'static str, text: &str) -> Result<()> {
    match find_reserved(text) {
        Some(ch) => Err(CodecError::ReservedCharacter {
            field,
            text: text.to_string(),
            ch,
        }),
        None => Ok(()),
    }
}
