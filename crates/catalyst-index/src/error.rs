//! Error types for index operations.

use catalyst_types::{EntityId, EntityType, Pointer};
use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The state lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A pointer changed owner between planning and applying an overwrite.
    #[error("stale overwrite plan: {entity_type} pointer '{pointer}' changed owner")]
    StalePlan {
        entity_type: EntityType,
        pointer: Pointer,
    },

    /// Restoring an entity whose pointer is already occupied.
    #[error("{entity_type} pointer '{pointer}' is already owned by {owner}")]
    PointerConflict {
        entity_type: EntityType,
        pointer: Pointer,
        owner: EntityId,
    },

    /// The two tables disagree.
    #[error("index invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience type alias for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
