//! History store persisted through [`ContentStorage`].
//!
//! Audit proofs live in the `proofs` category under `<type>-<entity id>`;
//! events live in the `history` category under their zero-padded timestamp
//! key. An in-memory copy serves reads and is only updated after the
//! corresponding writes are durable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use catalyst_crypto::{ContentHasher, MerkleTree};
use catalyst_store::{ContentStorage, StorageCategory};
use catalyst_types::{ContentHash, EntityId, EntityType, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HistoryError, HistoryResult};
use crate::records::{ActiveEntities, AuditInfo, HistoryEvent, HistoryQuery};
use crate::traits::HistoryStore;

#[derive(Default)]
struct HistoryState {
    audits: HashMap<(EntityType, EntityId), AuditInfo>,
    /// Keyed by storage key, which orders events chronologically.
    events: BTreeMap<String, HistoryEvent>,
}

/// [`HistoryStore`] backed by a [`ContentStorage`].
pub struct StorageHistory {
    storage: Arc<dyn ContentStorage>,
    state: RwLock<HistoryState>,
}

impl StorageHistory {
    /// An empty history over `storage`. Existing records are ignored; use
    /// [`Self::load`] to pick them up.
    pub fn new(storage: Arc<dyn ContentStorage>) -> Self {
        Self {
            storage,
            state: RwLock::new(HistoryState::default()),
        }
    }

    /// Rebuild the audit map and the event log from `storage`.
    pub async fn load(storage: Arc<dyn ContentStorage>) -> HistoryResult<Self> {
        let mut state = HistoryState::default();

        for key in storage.list(StorageCategory::Proofs).await? {
            let (entity_type, entity_id) = parse_proof_key(&key)?;
            let Some(bytes) = storage.retrieve(StorageCategory::Proofs, &key).await? else {
                continue;
            };
            let audit: AuditInfo = decode(&key, &bytes)?;
            state.audits.insert((entity_type, entity_id), audit);
        }

        for key in storage.list(StorageCategory::History).await? {
            let Some(bytes) = storage.retrieve(StorageCategory::History, &key).await? else {
                continue;
            };
            let event: HistoryEvent = decode(&key, &bytes)?;
            state.events.insert(key, event);
        }

        info!(
            audits = state.audits.len(),
            events = state.events.len(),
            "history loaded"
        );
        Ok(Self {
            storage,
            state: RwLock::new(state),
        })
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> HistoryResult<usize> {
        Ok(self.read()?.events.len())
    }

    fn read(&self) -> HistoryResult<RwLockReadGuard<'_, HistoryState>> {
        self.state
            .read()
            .map_err(|e| HistoryError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> HistoryResult<RwLockWriteGuard<'_, HistoryState>> {
        self.state
            .write()
            .map_err(|e| HistoryError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for StorageHistory {
    async fn record_deployment(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        audit: AuditInfo,
    ) -> HistoryResult<()> {
        let event = HistoryEvent::Deployment {
            timestamp: audit.deployed_timestamp,
            entity_type,
            entity_id,
        };
        let proof_key = proof_key(entity_type, &entity_id);
        let event_key = event.storage_key();

        self.storage
            .store(StorageCategory::Proofs, &proof_key, encode(&audit)?)
            .await?;
        if let Err(err) = self
            .storage
            .store(StorageCategory::History, &event_key, encode(&event)?)
            .await
        {
            if let Err(undo) = self.storage.delete(StorageCategory::Proofs, &proof_key).await {
                warn!(key = %proof_key, error = %undo, "failed to remove audit proof");
            }
            return Err(err.into());
        }

        let mut state = self.write()?;
        state.audits.insert((entity_type, entity_id), audit);
        state.events.insert(event_key, event);
        debug!(%entity_type, entity = %entity_id.short_hex(), "deployment recorded");
        Ok(())
    }

    async fn forget_deployment(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        timestamp: Timestamp,
    ) -> HistoryResult<()> {
        let event_key = HistoryEvent::Deployment {
            timestamp,
            entity_type,
            entity_id,
        }
        .storage_key();
        let proof_key = proof_key(entity_type, &entity_id);

        self.storage.delete(StorageCategory::History, &event_key).await?;
        self.storage.delete(StorageCategory::Proofs, &proof_key).await?;

        let mut state = self.write()?;
        state.events.remove(&event_key);
        state.audits.remove(&(entity_type, entity_id));
        debug!(%entity_type, entity = %entity_id.short_hex(), "deployment forgotten");
        Ok(())
    }

    async fn audit_info(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> HistoryResult<Option<AuditInfo>> {
        Ok(self.read()?.audits.get(&(entity_type, *entity_id)).cloned())
    }

    async fn history(&self, query: &HistoryQuery) -> HistoryResult<Vec<HistoryEvent>> {
        let state = self.read()?;
        Ok(state
            .events
            .values()
            .filter(|event| query.matches(event))
            .cloned()
            .collect())
    }

    async fn record_snapshot(
        &self,
        timestamp: Timestamp,
        active_entities: ActiveEntities,
    ) -> HistoryResult<HistoryEvent> {
        let (delta_events_hash, previous_snapshot_timestamp) = {
            let state = self.read()?;
            delta_since_last_snapshot(&state.events)?
        };
        let event = HistoryEvent::Snapshot {
            timestamp,
            active_entities,
            delta_events_hash,
            previous_snapshot_timestamp,
        };
        let key = event.storage_key();
        self.storage
            .store(StorageCategory::History, &key, encode(&event)?)
            .await?;

        self.write()?.events.insert(key, event.clone());
        info!(
            %timestamp,
            delta = %delta_events_hash.short_hex(),
            "snapshot recorded"
        );
        Ok(event)
    }

    async fn latest_timestamp(&self) -> HistoryResult<Option<Timestamp>> {
        Ok(self
            .read()?
            .events
            .values()
            .next_back()
            .map(HistoryEvent::timestamp))
    }
}

/// Merkle root over the deployment events after the newest snapshot, and
/// that snapshot's timestamp.
fn delta_since_last_snapshot(
    events: &BTreeMap<String, HistoryEvent>,
) -> HistoryResult<(ContentHash, Option<Timestamp>)> {
    let mut previous = None;
    let mut delta = Vec::new();
    for event in events.values().rev() {
        if let HistoryEvent::Snapshot { timestamp, .. } = event {
            previous = Some(*timestamp);
            break;
        }
        delta.push(event);
    }
    delta.reverse();

    let leaves = delta
        .into_iter()
        .map(|event| {
            ContentHasher::EVENT
                .hash_json(event)
                .map_err(|e| HistoryError::Serialization(e.to_string()))
        })
        .collect::<HistoryResult<Vec<_>>>()?;
    Ok((MerkleTree::from_leaves(&leaves).root(), previous))
}

fn proof_key(entity_type: EntityType, entity_id: &EntityId) -> String {
    format!("{entity_type}-{}", entity_id.to_hex())
}

fn parse_proof_key(key: &str) -> HistoryResult<(EntityType, EntityId)> {
    let corrupted = |reason: String| HistoryError::Corrupted {
        key: key.to_string(),
        reason,
    };
    let (ty, id) = key
        .split_once('-')
        .ok_or_else(|| corrupted("expected <type>-<entity id>".into()))?;
    let entity_type = ty.parse().map_err(|e| corrupted(format!("{e}")))?;
    let entity_id = EntityId::from_hex(id).map_err(|e| corrupted(format!("{e}")))?;
    Ok((entity_type, entity_id))
}

fn encode<T: Serialize>(value: &T) -> HistoryResult<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| HistoryError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> HistoryResult<T> {
    serde_json::from_slice(bytes).map_err(|e| HistoryError::Corrupted {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
