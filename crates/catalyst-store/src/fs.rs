use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use crate::category::StorageCategory;
use crate::error::{StorageError, StorageResult};
use crate::traits::ContentStorage;

const TEMP_PREFIX: &str = ".tmp-";

/// Filesystem content storage.
///
/// Layout: `<root>/<category>/<hex(key)>`. Keys are hex-encoded so any
/// pointer string is a valid file name. Writes go to a temporary file in the
/// same directory and are renamed into place, so a reader never observes a
/// partially written value.
pub struct FileSystemContentStorage {
    root: PathBuf,
}

impl FileSystemContentStorage {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for category in StorageCategory::all() {
            fs::create_dir_all(root.join(category.name())).await?;
        }
        info!(path = %root.display(), "opened filesystem storage");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn category_dir(&self, category: StorageCategory) -> PathBuf {
        self.root.join(category.name())
    }

    fn key_path(&self, category: StorageCategory, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
                reason: "empty key".to_string(),
            });
        }
        Ok(self.category_dir(category).join(hex::encode(key.as_bytes())))
    }

    fn temp_path(&self, category: StorageCategory) -> PathBuf {
        let suffix: u64 = rand::random();
        self.category_dir(category)
            .join(format!("{TEMP_PREFIX}{suffix:016x}"))
    }
}

#[async_trait]
impl ContentStorage for FileSystemContentStorage {
    async fn store(&self, category: StorageCategory, key: &str, value: Bytes) -> StorageResult<()> {
        let path = self.key_path(category, key)?;
        let temp = self.temp_path(category);
        let written = match fs::write(&temp, &value).await {
            Ok(()) => fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        debug!(%category, key, size = value.len(), "stored");
        Ok(())
    }

    async fn retrieve(&self, category: StorageCategory, key: &str) -> StorageResult<Option<Bytes>> {
        let path = self.key_path(category, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, category: StorageCategory, key: &str) -> StorageResult<bool> {
        let path = self.key_path(category, key)?;
        let existed = match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        debug!(%category, key, existed, "deleted");
        Ok(existed)
    }

    async fn exists(&self, category: StorageCategory, key: &str) -> StorageResult<bool> {
        let path = self.key_path(category, key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn list(&self, category: StorageCategory) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(self.category_dir(category)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let key = hex::decode(name)
                .ok()
                .and_then(|raw| String::from_utf8(raw).ok());
            if let Some(key) = key {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn exists_batch(
        &self,
        category: StorageCategory,
        keys: &[String],
    ) -> StorageResult<BTreeMap<String, bool>> {
        let checks = keys.iter().map(|key| async move {
            let present = self.exists(category, key).await?;
            Ok::<_, StorageError>((key.clone(), present))
        });
        Ok(futures::future::try_join_all(checks).await?.into_iter().collect())
    }
}

impl std::fmt::Debug for FileSystemContentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemContentStorage")
            .field("root", &self.root)
            .finish()
    }
}
