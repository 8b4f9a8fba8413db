use sieve_codec::CodecError;
use thiserror::Error;

/// A projection or filter that cannot be used. Raised at construction,
/// before any document is touched.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("inclusive projection requires at least one path")]
    EmptyInclusive,

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed filter document: {0}")]
    Codec(#[from] CodecError),
}

impl QueryError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}
