use async_trait::async_trait;
use catalyst_types::{EntityId, EntityType, Timestamp};

use crate::error::HistoryResult;
use crate::records::{ActiveEntities, AuditInfo, HistoryEvent, HistoryQuery};

/// Persistence of audit proofs and the deployment history.
///
/// A successful write is durable before it returns, and is visible to reads
/// only after it is durable.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist the audit proof and the deployment event of one commit.
    ///
    /// Either both are recorded or neither is.
    async fn record_deployment(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        audit: AuditInfo,
    ) -> HistoryResult<()>;

    /// Remove what [`Self::record_deployment`] recorded. Used to compensate
    /// a commit that failed after its history was written.
    async fn forget_deployment(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        timestamp: Timestamp,
    ) -> HistoryResult<()>;

    /// The audit proof of an entity, if it was ever deployed here.
    async fn audit_info(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> HistoryResult<Option<AuditInfo>>;

    /// Events matching `query`, in ascending timestamp order.
    async fn history(&self, query: &HistoryQuery) -> HistoryResult<Vec<HistoryEvent>>;

    /// Record a snapshot of `active_entities` taken at `timestamp`.
    async fn record_snapshot(
        &self,
        timestamp: Timestamp,
        active_entities: ActiveEntities,
    ) -> HistoryResult<HistoryEvent>;

    /// Timestamp of the newest event.
    async fn latest_timestamp(&self) -> HistoryResult<Option<Timestamp>>;
}
