use catalyst_types::{ContentHash, EntityId, EntityType, Pointer, SignerAddress, Timestamp};

/// Reasons a deployment is rejected by the gate.
///
/// Every variant is detected before any state is mutated, so a rejected
/// deployment never needs rollback.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The signature does not verify against the signer over the entity id.
    #[error("invalid signature from {signer}")]
    InvalidSignature { signer: SignerAddress },

    /// The batch exceeds the configured size ceiling.
    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// No file in the batch is named as the entity file.
    #[error("failed to find the entity file; make sure it is named 'entity.json'")]
    MissingEntityFile,

    /// More than one file in the batch is named as the entity file.
    #[error("found {count} files named 'entity.json'; upload exactly one")]
    DuplicateEntityFile { count: usize },

    /// The entity file's hash does not match the signed entity id.
    #[error("entity file hash {computed} does not match the signed entity id {claimed}")]
    EntityIdMismatch {
        claimed: EntityId,
        computed: ContentHash,
    },

    /// The signer may not write to one of the claimed pointers.
    #[error("{signer} is not allowed to deploy {entity_type} at pointer '{pointer}'")]
    AccessDenied {
        signer: SignerAddress,
        entity_type: EntityType,
        pointer: Pointer,
    },

    /// An existing occupant of a claimed pointer is as new or newer.
    #[error("deployment at pointer '{pointer}' is not fresh: {incoming} <= {current}")]
    DeploymentIsNotFresh {
        pointer: Pointer,
        current: Timestamp,
        incoming: Timestamp,
    },

    /// The entity violates the structural rules for its type.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// Referenced content is neither uploaded nor already stored.
    #[error("missing content: {}", join_hashes(.hashes))]
    MissingContent { hashes: Vec<ContentHash> },
}

fn join_hashes(hashes: &[ContentHash]) -> String {
    hashes
        .iter()
        .map(ContentHash::to_hex)
        .collect::<Vec<_>>()
        .join(", ")
}
