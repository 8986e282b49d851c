use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid pointer: {0:?}")]
    InvalidPointer(String),

    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("malformed entity file: {0}")]
    MalformedEntity(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
