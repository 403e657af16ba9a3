//! Key-Value Storage Backends

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::StorageError;

/// Durable storage boundary: one serialized blob per key
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, `None` if nothing is stored
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the blob stored under `key`
    async fn set(&self, key: &str, blob: String) -> Result<(), StorageError>;

    /// Delete the blob stored under `key`; deleting nothing is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Filesystem store, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path for a key
    pub fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }

    fn io_error(key: &str, err: io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), StorageError> {
        let path = self.path(key)?;
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        // Write beside the target and rename so readers never see a torn blob
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, blob.as_bytes())
            .await
            .map_err(|e| Self::io_error(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        debug!("Wrote {} bytes to {}", blob.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current blob for a key, read synchronously
    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .map(|blobs| blobs.get(key).cloned())
            .unwrap_or(None)
    }

    /// Every stored key, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Store a raw blob directly, bypassing serialization
    pub fn insert_raw(&self, key: &str, blob: &str) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key.to_string(), blob.to_string());
        }
    }

    fn lock_error(key: &str) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            reason: "memory store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().map_err(|_| Self::lock_error(key))?;
        Ok(blobs.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().map_err(|_| Self::lock_error(key))?;
        blobs.insert(key.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().map_err(|_| Self::lock_error(key))?;
        blobs.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("records").await.unwrap(), None);

        store.set("records", "[1,2,3]".to_string()).await.unwrap();
        assert_eq!(store.get("records").await.unwrap().as_deref(), Some("[1,2,3]"));
        assert!(!dir.path().join("data/records.json.tmp").exists());

        store.remove("records").await.unwrap();
        assert_eq!(store.get("records").await.unwrap(), None);

        // Removing an absent key is fine
        store.remove("records").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(
            store.get("../escape").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.set("", String::new()).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("records", "[]".to_string()).await.unwrap();
        assert_eq!(other.blob("records").as_deref(), Some("[]"));

        other.remove("records").await.unwrap();
        assert_eq!(store.get("records").await.unwrap(), None);
    }
}
