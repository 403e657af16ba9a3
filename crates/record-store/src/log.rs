//! Durable Record Log Primitives

use std::sync::Arc;
use tracing::debug;

use crate::backend::KeyValueStore;
use crate::{Record, StorageError};

/// Load/save/clear for the record sequence stored under one key
///
/// Callers must not interleave writes for the same key; [`crate::RecordStore`]
/// funnels every write through a single writer task.
#[derive(Clone)]
pub struct RecordLog {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl RecordLog {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted sequence; an absent blob is an empty log
    pub async fn load(&self) -> Result<Vec<Record>, StorageError> {
        let Some(blob) = self.storage.get(&self.key).await? else {
            debug!("No persisted blob under '{}'", self.key);
            return Ok(Vec::new());
        };

        serde_json::from_str(&blob).map_err(|e| StorageError::Corrupt {
            key: self.key.clone(),
            reason: e.to_string(),
        })
    }

    /// Serialize and overwrite the persisted sequence
    pub async fn save(&self, records: &[Record]) -> Result<(), StorageError> {
        let blob =
            serde_json::to_string(records).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set(&self.key, blob).await?;
        debug!("Persisted {} records under '{}'", records.len(), self.key);
        Ok(())
    }

    /// Delete the persisted blob
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key).await
    }

    /// Copy the raw blob aside under `"{key}.corrupt-{millis}"`
    ///
    /// Returns the backup key, or `None` when nothing is stored.
    pub async fn quarantine(&self) -> Result<Option<String>, StorageError> {
        let Some(blob) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };
        let backup = format!("{}.corrupt-{}", self.key, sensor_model::epoch_millis());
        self.storage.set(&backup, blob).await?;
        Ok(Some(backup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, RecordId, RecordOrigin};
    use chrono::Utc;
    use sensor_model::{FieldValue, RecordFields};

    fn sample(id: &str) -> Record {
        Record::new(
            RecordId::from(id),
            RecordFields {
                temperature: FieldValue::Number(24.3),
                tds: FieldValue::Number(310.0),
                turbidity: FieldValue::from("low"),
                water_level: FieldValue::Unavailable,
            },
            Utc::now(),
            RecordOrigin::Feed,
        )
    }

    #[tokio::test]
    async fn test_round_trip_is_lossless() {
        let storage = MemoryStore::new();
        let log = RecordLog::new(Arc::new(storage.clone()), "records");

        let mut manual = sample("b");
        manual.fields.turbidity = FieldValue::Number(4.5);
        manual.fields.tds = FieldValue::Text("310".to_string());
        let records = vec![sample("a"), manual];

        log.save(&records).await.unwrap();
        assert_eq!(log.load().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_missing_blob_is_empty() {
        let log = RecordLog::new(Arc::new(MemoryStore::new()), "records");
        assert!(log.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_blob_is_corrupt() {
        let storage = MemoryStore::new();
        storage.insert_raw("records", "{not json");
        let log = RecordLog::new(Arc::new(storage), "records");

        assert!(matches!(log.load().await, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_quarantine_copies_raw_blob() {
        let storage = MemoryStore::new();
        storage.insert_raw("records", "[{\"id\":");
        let log = RecordLog::new(Arc::new(storage.clone()), "records");

        let backup = log.quarantine().await.unwrap().unwrap();
        assert!(backup.starts_with("records.corrupt-"));
        assert_eq!(storage.blob(&backup).as_deref(), Some("[{\"id\":"));
        assert_eq!(storage.blob("records").as_deref(), Some("[{\"id\":"));

        let empty = RecordLog::new(Arc::new(MemoryStore::new()), "records");
        assert_eq!(empty.quarantine().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_removes_blob() {
        let storage = MemoryStore::new();
        let log = RecordLog::new(Arc::new(storage.clone()), "records");

        log.save(&[sample("a")]).await.unwrap();
        log.clear().await.unwrap();
        assert_eq!(storage.blob("records"), None);
    }
}
