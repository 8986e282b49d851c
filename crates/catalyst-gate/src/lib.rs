//! Validation gate pipeline for the Catalyst content engine.
//!
//! Every deployment must pass through the gate before anything is written.
//! The gate runs two fail-fast pipelines: batch stages over the raw signed
//! upload (signature, size, entity file presence, entity id), then entity
//! stages over the parsed entity and the current occupants of its pointers
//! (access, freshness, structure, content completeness).
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use catalyst_crypto::{hash_file, Ed25519Verifier, SigningKey};
//! use catalyst_gate::{BatchContext, DeploymentGate, GateConfig, RulePolicy};
//! use catalyst_types::{DeploymentFile, ENTITY_FILE_NAME};
//!
//! let gate = DeploymentGate::with_default_stages(
//!     GateConfig::default(),
//!     Arc::new(Ed25519Verifier),
//!     Arc::new(RulePolicy::default()),
//! );
//! let key = SigningKey::generate();
//! let files = vec![DeploymentFile::new(
//!     ENTITY_FILE_NAME,
//!     br#"{"type":"scene","pointers":["0,0"],"timestamp":1}"#.to_vec(),
//! )];
//! let entity_id = hash_file(&files[0]);
//! let signature = key.sign_entity(&entity_id);
//! let report = gate.check_batch(&BatchContext {
//!     entity_id: &entity_id,
//!     signer: &key.address(),
//!     signature: &signature,
//!     files: &files,
//! });
//! assert!(report.is_accepted());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod policy;
pub mod stage;
pub mod stages;

// Re-exports for convenience.
pub use config::GateConfig;
pub use error::ValidationError;
pub use gate::{DeploymentGate, GateReport};
pub use policy::{AccessPolicy, AccessRule, Parcel, PolicyConfig, RulePolicy, ValidationPolicy};
pub use stage::{BatchContext, BatchStage, EntityContext, EntityStage, StageDecision, StageResult};
