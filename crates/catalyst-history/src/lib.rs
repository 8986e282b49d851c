//! Audit proofs and deployment history for the Catalyst content engine.
//!
//! Every committed deployment leaves two records: an [`AuditInfo`] proof
//! (who signed it and when it was committed) and a
//! [`HistoryEvent::Deployment`]. Snapshots capture the whole pointer state
//! together with a Merkle digest of the deployments since the previous
//! snapshot.
//!
//! - [`records`]: Record types and [`HistoryQuery`]
//! - [`traits`]: The [`HistoryStore`] collaborator interface
//! - [`storage`]: [`StorageHistory`], persisted through `ContentStorage`

pub mod error;
pub mod records;
pub mod storage;
pub mod traits;

pub use error::{HistoryError, HistoryResult};
pub use records::{ActiveEntities, AuditInfo, HistoryEvent, HistoryQuery, HistoryType};
pub use storage::StorageHistory;
pub use traits::HistoryStore;
