use std::collections::HashSet;
use std::sync::Arc;

use catalyst_types::Entity;

use crate::error::ValidationError;
use crate::policy::ValidationPolicy;
use crate::stage::{EntityContext, EntityStage, StageDecision};

/// Longest pointer accepted, in bytes. Pointer records are stored under
/// the hex encoding of the pointer, which must fit a file name.
pub const MAX_POINTER_BYTES: usize = 120;

/// Generic shape checks followed by the policy's per-type schema.
pub struct StructureStage {
    policy: Arc<dyn ValidationPolicy>,
}

impl StructureStage {
    pub fn new(policy: Arc<dyn ValidationPolicy>) -> Self {
        Self { policy }
    }

    fn check_shape(entity: &Entity) -> Result<(), String> {
        if entity.pointers.is_empty() {
            return Err("an entity must claim at least one pointer".into());
        }

        if let Some(long) = entity.pointers.iter().find(|p| p.as_str().len() > MAX_POINTER_BYTES) {
            return Err(format!(
                "pointer '{long}' is longer than {MAX_POINTER_BYTES} bytes"
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = entity.pointers.iter().find(|p| !seen.insert(*p)) {
            return Err(format!("pointer '{dup}' is claimed twice"));
        }

        let mut names = HashSet::new();
        for entry in &entity.content {
            if entry.file.trim().is_empty() {
                return Err("content entry with an empty file name".into());
            }
            if !names.insert(entry.file.as_str()) {
                return Err(format!("content file '{}' is listed twice", entry.file));
            }
        }
        Ok(())
    }
}

impl EntityStage for StructureStage {
    fn name(&self) -> &str {
        "structure"
    }

    fn evaluate(&self, context: &EntityContext<'_>) -> StageDecision {
        let result = Self::check_shape(context.entity)
            .and_then(|()| self.policy.check_structure(context.entity))
            .map_err(ValidationError::InvalidEntity);
        result.into()
    }
}
