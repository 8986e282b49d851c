use crate::error::ValidationError;
use crate::stage::{EntityContext, EntityStage, StageDecision};

/// Every referenced hash must be uploaded now or already stored.
pub struct ContentStage;

impl EntityStage for ContentStage {
    fn name(&self) -> &str {
        "content"
    }

    fn evaluate(&self, context: &EntityContext<'_>) -> StageDecision {
        let missing: Vec<_> = context
            .entity
            .content_hashes()
            .into_iter()
            .filter(|h| !context.uploaded.contains(h) && !context.already_stored.contains(h))
            .collect();
        if missing.is_empty() {
            StageDecision::Pass
        } else {
            StageDecision::Fail(ValidationError::MissingContent { hashes: missing })
        }
    }
}
