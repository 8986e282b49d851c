//! The storage side of a deployment.
//!
//! Content objects are immutable and deduplicated, so writing them never
//! needs undoing. Pointer records are not: before a pointer record is
//! written or deleted, its previous state is logged so a failed commit can
//! put it back.

use std::collections::BTreeMap;

use bytes::Bytes;
use catalyst_index::OverwritePlan;
use catalyst_store::{ContentStorage, StorageCategory, StorageResult};
use catalyst_types::{ContentHash, EntityId, EntityType, Pointer};
use futures::future::try_join_all;
use tracing::{debug, warn};

/// Write content objects that are not stored yet. Returns how many were
/// written.
pub(crate) async fn store_contents(
    storage: &dyn ContentStorage,
    objects: BTreeMap<ContentHash, Bytes>,
) -> StorageResult<usize> {
    let count = objects.len();
    try_join_all(objects.into_iter().map(|(hash, bytes)| async move {
        storage
            .store(StorageCategory::Contents, &hash.to_hex(), bytes)
            .await
    }))
    .await?;
    debug!(count, "content objects stored");
    Ok(count)
}

/// Previous state of one pointer record.
#[derive(Clone, Debug, PartialEq, Eq)]
struct UndoEntry {
    pointer: Pointer,
    previous: Option<EntityId>,
}

/// Pointer record rewrites of one commit, with their undo log.
pub(crate) struct PointerCommit<'a> {
    storage: &'a dyn ContentStorage,
    entity_type: EntityType,
    undo: Vec<UndoEntry>,
}

impl<'a> PointerCommit<'a> {
    pub(crate) fn new(storage: &'a dyn ContentStorage, entity_type: EntityType) -> Self {
        Self {
            storage,
            entity_type,
            undo: Vec::new(),
        }
    }

    /// Point every claimed pointer at the incoming entity and delete the
    /// records of orphan pointers.
    ///
    /// `orphan_owners` names the displaced entity that held each orphan.
    pub(crate) async fn apply(
        &mut self,
        plan: &OverwritePlan,
        orphan_owners: &BTreeMap<Pointer, EntityId>,
    ) -> StorageResult<()> {
        let category = StorageCategory::Pointers(self.entity_type);

        for pointer in &plan.claimed {
            self.undo.push(UndoEntry {
                pointer: pointer.clone(),
                previous: plan.previous.get(pointer).copied(),
            });
        }
        for pointer in &plan.orphan_pointers {
            self.undo.push(UndoEntry {
                pointer: pointer.clone(),
                previous: orphan_owners.get(pointer).copied(),
            });
        }

        let value = Bytes::from(plan.incoming.to_hex());
        let storage = self.storage;
        let writes = plan.claimed.iter().map(|pointer| {
            let value = value.clone();
            async move { storage.store(category, pointer.as_str(), value).await }
        });
        let deletes = plan.orphan_pointers.iter().map(|pointer| async move {
            storage.delete(category, pointer.as_str()).await.map(|_| ())
        });

        try_join_all(writes).await?;
        try_join_all(deletes).await?;
        debug!(
            entity_type = %self.entity_type,
            written = plan.claimed.len(),
            deleted = plan.orphan_pointers.len(),
            "pointer records rewritten"
        );
        Ok(())
    }

    /// Put every logged pointer record back. Failures are logged and
    /// skipped so the remaining entries are still restored.
    pub(crate) async fn rollback(self) {
        let category = StorageCategory::Pointers(self.entity_type);
        for entry in self.undo.iter().rev() {
            let result = match entry.previous {
                Some(owner) => {
                    self.storage
                        .store(category, entry.pointer.as_str(), Bytes::from(owner.to_hex()))
                        .await
                }
                None => self
                    .storage
                    .delete(category, entry.pointer.as_str())
                    .await
                    .map(|_| ()),
            };
            if let Err(error) = result {
                warn!(
                    entity_type = %self.entity_type,
                    pointer = %entry.pointer,
                    %error,
                    "failed to restore pointer record"
                );
            }
        }
        debug!(entries = self.undo.len(), "pointer records rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use catalyst_store::InMemoryContentStorage;

    fn ptr(s: &str) -> Pointer {
        Pointer::new(s).unwrap()
    }

    fn id(n: u8) -> EntityId {
        ContentHash::from_hash([n; 32])
    }

    async fn owner(storage: &InMemoryContentStorage, p: &str) -> Option<String> {
        storage
            .retrieve(StorageCategory::Pointers(EntityType::Scene), p)
            .await
            .unwrap()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
    }

    /// A occupies {0,0 1,1}; B claims {1,1 2,2}.
    fn plan() -> (OverwritePlan, BTreeMap<Pointer, EntityId>) {
        let plan = OverwritePlan {
            entity_type: EntityType::Scene,
            incoming: id(2),
            claimed: BTreeSet::from([ptr("1,1"), ptr("2,2")]),
            displaced: BTreeSet::from([id(1)]),
            orphan_pointers: BTreeSet::from([ptr("0,0")]),
            previous: BTreeMap::from([(ptr("1,1"), id(1))]),
        };
        (plan, BTreeMap::from([(ptr("0,0"), id(1))]))
    }

    async fn seed(storage: &InMemoryContentStorage) {
        for p in ["0,0", "1,1"] {
            storage
                .store(
                    StorageCategory::Pointers(EntityType::Scene),
                    p,
                    Bytes::from(id(1).to_hex()),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn apply_rewrites_and_deletes() {
        let storage = InMemoryContentStorage::new();
        seed(&storage).await;
        let (plan, orphans) = plan();

        let mut commit = PointerCommit::new(&storage, EntityType::Scene);
        commit.apply(&plan, &orphans).await.unwrap();

        assert_eq!(owner(&storage, "0,0").await, None);
        assert_eq!(owner(&storage, "1,1").await, Some(id(2).to_hex()));
        assert_eq!(owner(&storage, "2,2").await, Some(id(2).to_hex()));
    }

    #[tokio::test]
    async fn rollback_restores_previous_records() {
        let storage = InMemoryContentStorage::new();
        seed(&storage).await;
        let (plan, orphans) = plan();

        let mut commit = PointerCommit::new(&storage, EntityType::Scene);
        commit.apply(&plan, &orphans).await.unwrap();
        commit.rollback().await;

        assert_eq!(owner(&storage, "0,0").await, Some(id(1).to_hex()));
        assert_eq!(owner(&storage, "1,1").await, Some(id(1).to_hex()));
        assert_eq!(owner(&storage, "2,2").await, None);
    }

    #[tokio::test]
    async fn store_contents_writes_each_object() {
        let storage = InMemoryContentStorage::new();
        let objects = BTreeMap::from([
            (id(7), Bytes::from_static(b"seven")),
            (id(8), Bytes::from_static(b"eight")),
        ]);
        assert_eq!(store_contents(&storage, objects).await.unwrap(), 2);
        assert_eq!(storage.len(StorageCategory::Contents), 2);
        assert_eq!(
            storage
                .retrieve(StorageCategory::Contents, &id(7).to_hex())
                .await
                .unwrap(),
            Some(Bytes::from_static(b"seven"))
        );
    }
}
