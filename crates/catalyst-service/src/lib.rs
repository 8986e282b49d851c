//! Deployment engine for the Catalyst content engine.
//!
//! [`DeploymentService`] accepts signed bundles of files, validates them
//! through the deployment gate, stores their content exactly once, and
//! redirects pointers from the entities they displace. Displaced entities are
//! evicted whole; pointers they held that the new entity does not claim are
//! freed, in memory and in storage.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalyst_crypto::SigningKey;
//! use catalyst_history::StorageHistory;
//! use catalyst_service::{content_entries, Deployment, DeploymentService, ServiceConfig};
//! use catalyst_store::InMemoryContentStorage;
//! use catalyst_types::{DeploymentFile, EntityFile, EntityType, Pointer, Timestamp};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(InMemoryContentStorage::new());
//! let history = Arc::new(StorageHistory::new(storage.clone()));
//! let service = DeploymentService::new(ServiceConfig::default(), storage, history);
//!
//! let key = SigningKey::generate();
//! let files = vec![DeploymentFile::new("scene.js", b"main()".to_vec())];
//! let entity = EntityFile {
//!     entity_type: EntityType::Scene,
//!     pointers: vec![Pointer::new("0,0")?],
//!     timestamp: Timestamp::now(),
//!     content: content_entries(&files),
//!     metadata: None,
//! };
//! let committed = service.deploy(Deployment::build(&entity, files, &key)?).await?;
//! println!("committed at {committed}");
//! # Ok(())
//! # }
//! ```

mod commit;
pub mod config;
pub mod deployment;
pub mod error;
mod restore;
pub mod service;

pub use config::{ServiceConfig, StorageConfig};
pub use deployment::{content_entries, Deployment};
pub use error::{FailureKind, ServiceError, ServiceResult};
pub use restore::RestoreReport;
pub use service::DeploymentService;
