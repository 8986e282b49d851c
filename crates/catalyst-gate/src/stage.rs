use std::collections::BTreeSet;
use std::time::Duration;

use catalyst_crypto::Signature;
use catalyst_types::{ContentHash, DeploymentFile, Entity, EntityId, SignerAddress};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage failed; the deployment is rejected.
    Fail(ValidationError),
}

impl StageDecision {
    /// Returns `true` if the decision is `Pass`.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns `true` if the decision is `Fail`.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

impl From<Result<(), ValidationError>> for StageDecision {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self::Pass,
            Err(e) => Self::Fail(e),
        }
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    /// Name of the stage that produced this result.
    pub stage_name: String,
    /// Whether the stage passed.
    pub passed: bool,
    /// Populated on failure.
    pub reason: Option<String>,
    /// Wall-clock time the stage took to evaluate.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// What the batch stages see: the raw signed upload, before parsing.
#[derive(Clone, Copy, Debug)]
pub struct BatchContext<'a> {
    /// The entity id the deployer signed.
    pub entity_id: &'a EntityId,
    pub signer: &'a SignerAddress,
    pub signature: &'a Signature,
    /// Every uploaded file, the entity file included.
    pub files: &'a [DeploymentFile],
}

/// What the entity stages see: the parsed entity and the state it lands on.
#[derive(Clone, Copy, Debug)]
pub struct EntityContext<'a> {
    pub entity: &'a Entity,
    pub signer: &'a SignerAddress,
    /// Distinct entities currently occupying any pointer the entity claims.
    pub occupants: &'a [Entity],
    /// Content hashes of the files uploaded alongside the entity file.
    pub uploaded: &'a BTreeSet<ContentHash>,
    /// Referenced content hashes already present in storage.
    pub already_stored: &'a BTreeSet<ContentHash>,
}

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// A check over the raw batch.
///
/// Batch stages run before the entity file is parsed: they protect the
/// parser from unsigned, oversized, or tampered input.
pub trait BatchStage: Send + Sync {
    /// Human-readable name of this stage (e.g. "signature", "request-size").
    fn name(&self) -> &str;

    fn evaluate(&self, context: &BatchContext<'_>) -> StageDecision;
}

/// A check over the parsed entity and the current occupants of its pointers.
pub trait EntityStage: Send + Sync {
    /// Human-readable name of this stage (e.g. "access", "freshness").
    fn name(&self) -> &str;

    fn evaluate(&self, context: &EntityContext<'_>) -> StageDecision;
}
