//! Type-scoped per-pointer locks.
//!
//! A deployment holds the locks of every pointer its commit reads or writes.
//! Locks are always acquired in sorted pointer order, so two deployments
//! that want overlapping sets cannot deadlock. Deployments over disjoint
//! pointer sets never contend.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use catalyst_types::{EntityType, Pointer};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (EntityType, Pointer);
type LockTable = HashMap<LockKey, Arc<AsyncMutex<()>>>;

/// Registry of pointer locks.
///
/// Entries are created on demand and pruned when the last holder releases,
/// so the table only ever holds pointers with an in-flight deployment.
#[derive(Debug, Default)]
pub struct PointerLocks {
    table: Arc<Mutex<LockTable>>,
}

impl PointerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the locks of every pointer in `pointers`, in sorted order.
    pub async fn lock(
        &self,
        entity_type: EntityType,
        pointers: impl IntoIterator<Item = Pointer>,
    ) -> PointerGuard {
        let wanted: BTreeSet<Pointer> = pointers.into_iter().collect();
        let mutexes: Vec<(Pointer, Arc<AsyncMutex<()>>)> = {
            let mut table = lock_table(&self.table);
            wanted
                .into_iter()
                .map(|p| {
                    let mutex = Arc::clone(table.entry((entity_type, p.clone())).or_default());
                    (p, mutex)
                })
                .collect()
        };

        let mut held = Vec::with_capacity(mutexes.len());
        for (pointer, mutex) in mutexes {
            held.push((pointer, mutex.lock_owned().await));
        }

        PointerGuard {
            entity_type,
            table: Arc::clone(&self.table),
            held,
        }
    }

    /// Number of pointers with a live lock entry.
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a set of pointer locks until dropped.
pub struct PointerGuard {
    entity_type: EntityType,
    table: Arc<Mutex<LockTable>>,
    held: Vec<(Pointer, OwnedMutexGuard<()>)>,
}

impl PointerGuard {
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The pointers this guard holds.
    pub fn pointers(&self) -> BTreeSet<Pointer> {
        self.held.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Returns `true` if every pointer in `pointers` is held.
    pub fn covers(&self, pointers: &BTreeSet<Pointer>) -> bool {
        pointers.is_subset(&self.pointers())
    }
}

impl Drop for PointerGuard {
    fn drop(&mut self) {
        for (pointer, guard) in self.held.drain(..) {
            let mutex = Arc::clone(OwnedMutexGuard::mutex(&guard));
            drop(guard);
            let mut table = lock_table(&self.table);
            // One reference in the table, one here: nobody else is waiting.
            if Arc::strong_count(&mutex) == 2 {
                table.remove(&(self.entity_type, pointer));
            }
        }
    }
}

impl std::fmt::Debug for PointerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerGuard")
            .field("entity_type", &self.entity_type)
            .field("pointers", &self.pointers())
            .finish()
    }
}

// The table is a cache of mutex handles; a poisoned one is still usable.
fn lock_table(table: &Mutex<LockTable>) -> std::sync::MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn ptr(s: &str) -> Pointer {
        Pointer::new(s).unwrap()
    }

    #[tokio::test]
    async fn guard_reports_held_pointers() {
        let locks = PointerLocks::new();
        let guard = locks
            .lock(EntityType::Scene, [ptr("1,1"), ptr("0,0"), ptr("1,1")])
            .await;
        assert_eq!(guard.pointers(), BTreeSet::from([ptr("0,0"), ptr("1,1")]));
        assert!(guard.covers(&BTreeSet::from([ptr("0,0")])));
        assert!(!guard.covers(&BTreeSet::from([ptr("2,2")])));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_pruned_on_release() {
        let locks = PointerLocks::new();
        {
            let _guard = locks.lock(EntityType::Scene, [ptr("0,0")]).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn disjoint_sets_do_not_block() {
        let locks = PointerLocks::new();
        let _a = locks.lock(EntityType::Scene, [ptr("0,0")]).await;
        let b = tokio::time::timeout(
            Duration::from_millis(200),
            locks.lock(EntityType::Scene, [ptr("1,1")]),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn same_pointer_other_type_does_not_block() {
        let locks = PointerLocks::new();
        let _a = locks.lock(EntityType::Scene, [ptr("0,0")]).await;
        let b = tokio::time::timeout(
            Duration::from_millis(200),
            locks.lock(EntityType::Wearable, [ptr("0,0")]),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn overlapping_sets_serialize() {
        let locks = Arc::new(PointerLocks::new());
        let first = locks.lock(EntityType::Scene, [ptr("0,0"), ptr("0,1")]).await;
        let acquired = Arc::new(AtomicBool::new(false));

        let task = {
            let locks = Arc::clone(&locks);
            let acquired = Arc::clone(&acquired);
            tokio::spawn(async move {
                let _g = locks.lock(EntityType::Scene, [ptr("0,1"), ptr("5,5")]).await;
                acquired.store(true, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!acquired.load(Ordering::SeqCst));
        drop(first);
        task.await.unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn crossing_orders_do_not_deadlock() {
        let locks = Arc::new(PointerLocks::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let locks = Arc::clone(&locks);
            tasks.push(tokio::spawn(async move {
                let set = if i % 2 == 0 {
                    vec![ptr("a"), ptr("b")]
                } else {
                    vec![ptr("b"), ptr("a")]
                };
                let _g = locks.lock(EntityType::Scene, set).await;
                tokio::task::yield_now().await;
            }));
        }
        let all = futures::future::join_all(tasks);
        let results = tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock ordering deadlocked");
        assert!(results.into_iter().all(|r| r.is_ok()));
        assert!(locks.is_empty());
    }
}
