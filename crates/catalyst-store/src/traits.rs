use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::category::StorageCategory;
use crate::error::StorageResult;

/// Durable key/value byte store addressed by category and key.
///
/// All implementations must satisfy these invariants:
/// - A successful `store` is durable before it returns.
/// - Keys are independent. There are no transactional guarantees across keys;
///   callers that need atomicity supply it themselves.
/// - The store never interprets values. It is a pure key-value store.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    async fn store(&self, category: StorageCategory, key: &str, value: Bytes) -> StorageResult<()>;

    /// Read the value under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn retrieve(&self, category: StorageCategory, key: &str) -> StorageResult<Option<Bytes>>;

    /// Delete `key`. Returns `true` if the key existed.
    async fn delete(&self, category: StorageCategory, key: &str) -> StorageResult<bool>;

    /// Check whether `key` exists.
    async fn exists(&self, category: StorageCategory, key: &str) -> StorageResult<bool>;

    /// Every key in `category`, in ascending order.
    async fn list(&self, category: StorageCategory) -> StorageResult<Vec<String>>;

    /// Existence of several keys at once.
    ///
    /// Default implementation calls `exists()` for each key. Backends may
    /// override for better performance (e.g. fewer I/O round-trips).
    async fn exists_batch(
        &self,
        category: StorageCategory,
        keys: &[String],
    ) -> StorageResult<BTreeMap<String, bool>> {
        let mut result = BTreeMap::new();
        for key in keys {
            let present = self.exists(category, key).await?;
            result.insert(key.clone(), present);
        }
        Ok(result)
    }
}
