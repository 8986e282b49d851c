use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::category::StorageCategory;
use crate::error::{StorageError, StorageResult};
use crate::traits::ContentStorage;

type Tables = HashMap<StorageCategory, BTreeMap<String, Bytes>>;

/// In-memory content storage.
///
/// Intended for tests and embedding. All values are held in memory behind a
/// `RwLock`. Every call to `store` bumps a write counter, which lets tests
/// assert that deduplicated content was written exactly once.
pub struct InMemoryContentStorage {
    tables: RwLock<Tables>,
    writes: AtomicU64,
}

impl InMemoryContentStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of `store` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of keys currently in `category`.
    pub fn len(&self, category: StorageCategory) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(&category).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Returns `true` if `category` holds no keys.
    pub fn is_empty(&self, category: StorageCategory) -> bool {
        self.len(category) == 0
    }

    fn read_tables(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write_tables(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryContentStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStorage for InMemoryContentStorage {
    async fn store(&self, category: StorageCategory, key: &str, value: Bytes) -> StorageResult<()> {
        let size = value.len();
        self.write_tables()?
            .entry(category)
            .or_default()
            .insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(%category, key, size, "stored");
        Ok(())
    }

    async fn retrieve(&self, category: StorageCategory, key: &str) -> StorageResult<Option<Bytes>> {
        let tables = self.read_tables()?;
        Ok(tables.get(&category).and_then(|t| t.get(key)).cloned())
    }

    async fn delete(&self, category: StorageCategory, key: &str) -> StorageResult<bool> {
        let existed = self
            .write_tables()?
            .get_mut(&category)
            .map(|t| t.remove(key).is_some())
            .unwrap_or(false);
        debug!(%category, key, existed, "deleted");
        Ok(existed)
    }

    async fn exists(&self, category: StorageCategory, key: &str) -> StorageResult<bool> {
        let tables = self.read_tables()?;
        Ok(tables.get(&category).is_some_and(|t| t.contains_key(key)))
    }

    async fn list(&self, category: StorageCategory) -> StorageResult<Vec<String>> {
        let tables = self.read_tables()?;
        Ok(tables
            .get(&category)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn exists_batch(
        &self,
        category: StorageCategory,
        keys: &[String],
    ) -> StorageResult<BTreeMap<String, bool>> {
        let tables = self.read_tables()?;
        let table = tables.get(&category);
        Ok(keys
            .iter()
            .map(|k| (k.clone(), table.is_some_and(|t| t.contains_key(k))))
            .collect())
    }
}

impl std::fmt::Debug for InMemoryContentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStorage")
            .field("write_count", &self.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_types::EntityType;

    const SCENES: StorageCategory = StorageCategory::Pointers(EntityType::Scene);

    #[tokio::test]
    async fn store_and_retrieve() {
        let storage = InMemoryContentStorage::new();
        storage
            .store(StorageCategory::Contents, "abc", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let value = storage
            .retrieve(StorageCategory::Contents, "abc")
            .await
            .unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn retrieve_missing_is_none() {
        let storage = InMemoryContentStorage::new();
        assert!(storage
            .retrieve(StorageCategory::Contents, "nope")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn categories_are_independent() {
        let storage = InMemoryContentStorage::new();
        storage
            .store(SCENES, "0,0", Bytes::from_static(b"id"))
            .await
            .unwrap();
        assert!(storage.exists(SCENES, "0,0").await.unwrap());
        assert!(!storage
            .exists(StorageCategory::Pointers(EntityType::Profile), "0,0")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let storage = InMemoryContentStorage::new();
        storage
            .store(SCENES, "0,0", Bytes::from_static(b"id"))
            .await
            .unwrap();
        assert!(storage.delete(SCENES, "0,0").await.unwrap());
        assert!(!storage.delete(SCENES, "0,0").await.unwrap());
        assert!(storage.is_empty(SCENES));
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let storage = InMemoryContentStorage::new();
        for key in ["b", "c", "a"] {
            storage
                .store(StorageCategory::History, key, Bytes::new())
                .await
                .unwrap();
        }
        assert_eq!(
            storage.list(StorageCategory::History).await.unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn exists_batch_reports_each_key() {
        let storage = InMemoryContentStorage::new();
        storage
            .store(StorageCategory::Contents, "x", Bytes::new())
            .await
            .unwrap();
        let keys = vec!["x".to_string(), "y".to_string()];
        let result = storage
            .exists_batch(StorageCategory::Contents, &keys)
            .await
            .unwrap();
        assert!(result["x"]);
        assert!(!result["y"]);
    }

    #[tokio::test]
    async fn write_count_counts_every_store() {
        let storage = InMemoryContentStorage::new();
        for _ in 0..3 {
            storage
                .store(StorageCategory::Contents, "same", Bytes::new())
                .await
                .unwrap();
        }
        assert_eq!(storage.write_count(), 3);
        assert_eq!(storage.len(StorageCategory::Contents), 1);
    }
}
