use std::sync::Arc;

use crate::error::ValidationError;
use crate::policy::ValidationPolicy;
use crate::stage::{EntityContext, EntityStage, StageDecision};

/// Asks the policy whether the signer may claim every pointer.
pub struct AccessStage {
    policy: Arc<dyn ValidationPolicy>,
}

impl AccessStage {
    pub fn new(policy: Arc<dyn ValidationPolicy>) -> Self {
        Self { policy }
    }
}

impl EntityStage for AccessStage {
    fn name(&self) -> &str {
        "access"
    }

    fn evaluate(&self, context: &EntityContext<'_>) -> StageDecision {
        let entity = context.entity;
        let denied = entity
            .pointers
            .iter()
            .find(|p| !self.policy.can_write(context.signer, entity.entity_type, p));
        match denied {
            Some(pointer) => StageDecision::Fail(ValidationError::AccessDenied {
                signer: *context.signer,
                entity_type: entity.entity_type,
                pointer: pointer.clone(),
            }),
            None => StageDecision::Pass,
        }
    }
}
