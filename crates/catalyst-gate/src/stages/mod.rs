//! Built-in gate stages.

pub mod access;
pub mod content;
pub mod freshness;
pub mod integrity;
pub mod signature;
pub mod structure;

pub use access::AccessStage;
pub use content::ContentStage;
pub use freshness::FreshnessStage;
pub use integrity::{EntityFileStage, EntityIdStage, RequestSizeStage};
pub use signature::SignatureStage;
pub use structure::{StructureStage, MAX_POINTER_BYTES};
