//! Pointer index for the Catalyst content engine.
//!
//! Every entity type has its own pointer namespace. Within a namespace a
//! pointer is owned by at most one live entity, and a live entity owns every
//! pointer it claims. Deploying an entity that claims some of another
//! entity's pointers evicts that entity as a whole; its remaining pointers
//! become free.
//!
//! # Modules
//!
//! - [`index`]: The [`EntityIndex`] pointer and entity tables
//! - [`plan`]: [`OverwritePlan`], the computed effect of one commit
//! - [`locks`]: [`PointerLocks`], per-pointer mutual exclusion for deployers
//! - [`error`]: Error types for index operations

pub mod error;
pub mod index;
pub mod locks;
pub mod plan;

pub use error::{IndexError, IndexResult};
pub use index::{EntityIndex, PointerTables};
pub use locks::{PointerGuard, PointerLocks};
pub use plan::OverwritePlan;
