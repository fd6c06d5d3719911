use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown block kind: {0}")]
    UnknownKind(String),

    #[error("invalid byte range [{start}, {end}) for {path} of size {size}")]
    InvalidRange {
        path: String,
        start: i64,
        end: i64,
        size: i64,
    },
}
