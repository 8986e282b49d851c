use catalyst_store::StorageError;

/// Errors produced by audit and history operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record that cannot be decoded.
    #[error("corrupted record {key:?}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
