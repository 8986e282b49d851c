use crate::error::ValidationError;
use crate::stage::{EntityContext, EntityStage, StageDecision};

/// Requires the entity to be strictly newer than every current occupant.
///
/// An occupant with the same id is the entity itself: a redeploy of an
/// already committed entity passes here and is recognized downstream.
pub struct FreshnessStage;

impl EntityStage for FreshnessStage {
    fn name(&self) -> &str {
        "freshness"
    }

    fn evaluate(&self, context: &EntityContext<'_>) -> StageDecision {
        let entity = context.entity;
        for occupant in context.occupants {
            if occupant.id == entity.id || entity.timestamp.is_after(&occupant.timestamp) {
                continue;
            }
            let Some(pointer) = entity.pointers.iter().find(|p| occupant.claims(p)) else {
                continue;
            };
            return StageDecision::Fail(ValidationError::DeploymentIsNotFresh {
                pointer: pointer.clone(),
                current: occupant.timestamp,
                incoming: entity.timestamp,
            });
        }
        StageDecision::Pass
    }
}
