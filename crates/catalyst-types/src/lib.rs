//! Foundation types for the Catalyst content engine.
//!
//! This crate provides the identity, addressing, and temporal types used
//! throughout the deployment pipeline. Every other Catalyst crate depends on
//! `catalyst-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`] / [`EntityId`]: content address of a file or entity
//! - [`Pointer`] and [`EntityType`]: the logical addresses entities claim
//! - [`Entity`] and [`EntityFile`]: a deployed entity and its serialized form
//! - [`DeploymentFile`]: a named blob in a deployment batch
//! - [`SignerAddress`]: the identity that signed a deployment
//! - [`Timestamp`] and [`MonotonicClock`]: millisecond time and commit clock

pub mod address;
pub mod clock;
pub mod entity;
pub mod error;
pub mod hash;
pub mod pointer;
pub mod timestamp;

pub use address::SignerAddress;
pub use clock::MonotonicClock;
pub use entity::{ContentEntry, DeploymentFile, Entity, EntityFile, ENTITY_FILE_NAME};
pub use error::TypeError;
pub use hash::{ContentHash, EntityId};
pub use pointer::{EntityType, Pointer};
pub use timestamp::Timestamp;
