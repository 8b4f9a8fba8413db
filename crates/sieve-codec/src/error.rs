use thiserror::Error;

/// Failure while decoding or encoding BSON bytes.
///
/// Every variant is fatal for the call that produced it; the codec never
/// resynchronizes after a malformed element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input at offset {offset}: {needed} more bytes required")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("malformed bson at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("unsupported element type 0x{tag:02x} at offset {offset}")]
    UnsupportedType { tag: u8, offset: usize },

    #[error("invalid utf-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("key contains a nul byte: {0:?}")]
    InvalidKey(String),

    #[error("container nesting exceeds {0} levels")]
    DepthLimitExceeded(usize),

    #[error("output buffer full: {needed} bytes requested, {available} available")]
    BufferFull { needed: usize, available: usize },

    #[error("document of {0} bytes exceeds the i32 length field")]
    TooLarge(usize),

    #[error("writer misuse: {0}")]
    InvalidState(&'static str),
}

impl CodecError {
    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::Malformed { offset, reason }
    }
}
