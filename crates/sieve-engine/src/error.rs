use sieve_codec::CodecError;
use sieve_query::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("codec error: {0}")]
    Codec(CodecError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("document nesting exceeds {0} levels")]
    DepthLimitExceeded(usize),

    #[error("in-place write at offset {write} would overtake unread input at offset {read}")]
    InPlaceOverrun { write: usize, read: usize },

    #[error("{0} trailing bytes after the document")]
    TrailingBytes(usize),
}

impl From<CodecError> for EngineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::DepthLimitExceeded(limit) => EngineError::DepthLimitExceeded(limit),
            other => EngineError::Codec(other),
        }
    }
}
