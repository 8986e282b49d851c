use std::sync::Arc;

use catalyst_crypto::SignatureVerifier;

use crate::error::ValidationError;
use crate::stage::{BatchContext, BatchStage, StageDecision};

/// Verifies the deployer's signature over the entity id.
pub struct SignatureStage {
    verifier: Arc<dyn SignatureVerifier>,
}

impl SignatureStage {
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }
}

impl BatchStage for SignatureStage {
    fn name(&self) -> &str {
        "signature"
    }

    fn evaluate(&self, context: &BatchContext<'_>) -> StageDecision {
        match self
            .verifier
            .verify(context.signer, context.entity_id, context.signature)
        {
            Ok(()) => StageDecision::Pass,
            Err(_) => StageDecision::Fail(ValidationError::InvalidSignature {
                signer: *context.signer,
            }),
        }
    }
}
