/// Errors that can occur while encoding messages or splitting lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The encoded message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A parameter key is empty.
    #[error("parameter key must not be empty")]
    EmptyKey,

    /// Two keys are equal once lowercased, in case-insensitive mode.
    #[error("parameter key '{0}' collides with another key when case is ignored")]
    DuplicateKey(String),

    /// A key or value contains a character reserved by the wire format.
    #[error("{field} '{text}' contains reserved character {ch:?}")]
    ReservedCharacter {
        field: &'static str,
        text: String,
        ch: char,
    },

    /// An incoming line exceeds the configured maximum size.
    #[error("line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
