use catalyst_crypto::hash_file;

use crate::error::ValidationError;
use crate::stage::{BatchContext, BatchStage, StageDecision};

/// Rejects batches whose total size exceeds the configured ceiling.
pub struct RequestSizeStage {
    pub max_bytes: u64,
}

impl BatchStage for RequestSizeStage {
    fn name(&self) -> &str {
        "request-size"
    }

    fn evaluate(&self, context: &BatchContext<'_>) -> StageDecision {
        let size: u64 = context.files.iter().map(|f| f.len() as u64).sum();
        if size > self.max_bytes {
            return StageDecision::Fail(ValidationError::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        StageDecision::Pass
    }
}

/// Requires exactly one file named as the entity file.
pub struct EntityFileStage;

impl BatchStage for EntityFileStage {
    fn name(&self) -> &str {
        "entity-file"
    }

    fn evaluate(&self, context: &BatchContext<'_>) -> StageDecision {
        match context.files.iter().filter(|f| f.is_entity_file()).count() {
            0 => StageDecision::Fail(ValidationError::MissingEntityFile),
            1 => StageDecision::Pass,
            count => StageDecision::Fail(ValidationError::DuplicateEntityFile { count }),
        }
    }
}

/// Recomputes the entity file's hash and compares it to the signed id.
pub struct EntityIdStage;

impl BatchStage for EntityIdStage {
    fn name(&self) -> &str {
        "entity-id"
    }

    fn evaluate(&self, context: &BatchContext<'_>) -> StageDecision {
        let Some(file) = context.files.iter().find(|f| f.is_entity_file()) else {
            return StageDecision::Fail(ValidationError::MissingEntityFile);
        };
        let computed = hash_file(file);
        if computed != *context.entity_id {
            return StageDecision::Fail(ValidationError::EntityIdMismatch {
                claimed: *context.entity_id,
                computed,
            });
        }
        StageDecision::Pass
    }
}
