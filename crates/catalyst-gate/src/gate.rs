use std::sync::Arc;
use std::time::{Duration, Instant};

use catalyst_crypto::SignatureVerifier;
use tracing::debug;

use crate::config::GateConfig;
use crate::error::ValidationError;
use crate::policy::ValidationPolicy;
use crate::stage::{BatchContext, BatchStage, EntityContext, EntityStage, StageDecision, StageResult};
use crate::stages::{
    AccessStage, ContentStage, EntityFileStage, EntityIdStage, FreshnessStage, RequestSizeStage,
    SignatureStage, StructureStage,
};

// ---------------------------------------------------------------------------
// GateReport
// ---------------------------------------------------------------------------

/// The outcome of running one phase of the pipeline.
#[derive(Clone, Debug)]
pub struct GateReport {
    /// The first failure, if any. `None` means every stage passed.
    pub rejection: Option<ValidationError>,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the phase.
    pub elapsed: Duration,
}

impl GateReport {
    /// Returns `true` if every stage passed.
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }

    /// Convert into a `Result`, surfacing the rejection as the error.
    pub fn into_result(self) -> Result<Self, ValidationError> {
        match self.rejection {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

// ---------------------------------------------------------------------------
// DeploymentGate
// ---------------------------------------------------------------------------

/// The deployment gate: two ordered pipelines every deployment passes
/// through before anything is written.
///
/// Batch stages run over the raw upload; entity stages run once the entity
/// file is parsed and the occupants of its pointers are known. Both are
/// **fail-fast**: the first failing stage ends the phase.
pub struct DeploymentGate {
    batch_stages: Vec<Box<dyn BatchStage>>,
    entity_stages: Vec<Box<dyn EntityStage>>,
    config: GateConfig,
}

impl DeploymentGate {
    /// Create a gate with empty pipelines.
    ///
    /// Use [`Self::add_batch_stage`] / [`Self::add_entity_stage`] to add
    /// stages, or [`Self::with_default_stages`] for the standard pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            batch_stages: Vec::new(),
            entity_stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the default pipeline:
    ///
    /// - batch: signature -> request-size -> entity-file -> entity-id
    /// - entity: access -> freshness -> structure -> content
    ///
    /// The signature and access stages are left out when the configuration
    /// disables them.
    pub fn with_default_stages(
        config: GateConfig,
        verifier: Arc<dyn SignatureVerifier>,
        policy: Arc<dyn ValidationPolicy>,
    ) -> Self {
        let mut gate = Self::new(config);
        if gate.config.verify_signatures {
            gate.add_batch_stage(Box::new(SignatureStage::new(verifier)));
        }
        gate.add_batch_stage(Box::new(RequestSizeStage {
            max_bytes: gate.config.max_request_bytes,
        }));
        gate.add_batch_stage(Box::new(EntityFileStage));
        gate.add_batch_stage(Box::new(EntityIdStage));

        if gate.config.enforce_access {
            gate.add_entity_stage(Box::new(AccessStage::new(Arc::clone(&policy))));
        }
        gate.add_entity_stage(Box::new(FreshnessStage));
        gate.add_entity_stage(Box::new(StructureStage::new(policy)));
        gate.add_entity_stage(Box::new(ContentStage));
        gate
    }

    /// Append a stage to the end of the batch pipeline.
    pub fn add_batch_stage(&mut self, stage: Box<dyn BatchStage>) {
        self.batch_stages.push(stage);
    }

    /// Append a stage to the end of the entity pipeline.
    pub fn add_entity_stage(&mut self, stage: Box<dyn EntityStage>) {
        self.entity_stages.push(stage);
    }

    /// The current configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Number of stages across both pipelines.
    pub fn stage_count(&self) -> usize {
        self.batch_stages.len() + self.entity_stages.len()
    }

    /// Names of every stage, batch stages first.
    pub fn stage_names(&self) -> Vec<&str> {
        self.batch_stages
            .iter()
            .map(|s| s.name())
            .chain(self.entity_stages.iter().map(|s| s.name()))
            .collect()
    }

    /// Run the batch pipeline.
    pub fn check_batch(&self, context: &BatchContext<'_>) -> GateReport {
        run(
            &self.batch_stages,
            context,
            |stage| stage.name().to_string(),
            |stage, ctx| stage.evaluate(ctx),
        )
    }

    /// Run the entity pipeline.
    pub fn check_entity(&self, context: &EntityContext<'_>) -> GateReport {
        run(
            &self.entity_stages,
            context,
            |stage| stage.name().to_string(),
            |stage, ctx| stage.evaluate(ctx),
        )
    }
}

fn run<S: ?Sized, C>(
    stages: &[Box<S>],
    context: &C,
    name_of: impl Fn(&S) -> String,
    evaluate: impl Fn(&S, &C) -> StageDecision,
) -> GateReport {
    let pipeline_start = Instant::now();
    let mut stage_results = Vec::with_capacity(stages.len());

    for stage in stages.iter().map(|boxed| &**boxed) {
        let name = name_of(stage);
        let stage_start = Instant::now();
        let decision = evaluate(stage, context);
        let elapsed = stage_start.elapsed();

        let reason = match &decision {
            StageDecision::Pass => None,
            StageDecision::Fail(e) => Some(e.to_string()),
        };
        debug!(stage = %name, passed = reason.is_none(), ?elapsed, "gate stage evaluated");

        stage_results.push(StageResult {
            stage_name: name,
            passed: reason.is_none(),
            reason,
            elapsed,
        });

        // Fail-fast: stop on first failure.
        if let StageDecision::Fail(e) = decision {
            return GateReport {
                rejection: Some(e),
                stage_results,
                elapsed: pipeline_start.elapsed(),
            };
        }
    }

    GateReport {
        rejection: None,
        stage_results,
        elapsed: pipeline_start.elapsed(),
    }
}
