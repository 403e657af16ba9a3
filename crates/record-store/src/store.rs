//! In-Memory Record Store

use sensor_model::RecordFields;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::backend::KeyValueStore;
use crate::log::RecordLog;
use crate::writer::{PersistQueue, PersistTicket, Snapshot};
use crate::{Record, RecordId, StorageError};

struct Inner {
    records: Vec<Record>,
    ids: HashSet<RecordId>,
    /// Bumped by every mutation
    version: u64,
}

impl Inner {
    fn new(records: Vec<Record>) -> Self {
        let mut ids = HashSet::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if ids.insert(record.id().clone()) {
                kept.push(record);
            } else {
                warn!("Dropping duplicate record id {} from persisted log", record.id());
            }
        }
        Self {
            records: kept,
            ids,
            version: 0,
        }
    }

    /// Record a mutation and return its version
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ordered record log with asynchronous, serialized persistence
///
/// Every mutation updates memory synchronously and enqueues a write for the
/// writer while still holding the lock, so persisted writes land in the same
/// order as the mutations that produced them and never move the blob back to
/// an older sequence.
pub struct RecordStore {
    key: String,
    inner: Arc<Mutex<Inner>>,
    queue: PersistQueue,
}

impl RecordStore {
    /// Hydrate from storage and start the writer task
    ///
    /// A blob that cannot be read leaves the store empty; the error is logged,
    /// not returned. The unreadable blob is copied aside before any write can
    /// replace it. If it cannot be copied, writes are held for the lifetime of
    /// the store and every ticket resolves to [`StorageError::WritesHeld`].
    pub async fn open(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let log = RecordLog::new(storage, key);
        let (records, held) = match log.load().await {
            Ok(records) => (records, false),
            Err(e) => {
                warn!("Could not load records, starting empty: {}", e);
                match log.quarantine().await {
                    Ok(Some(backup)) => {
                        warn!("Copied unreadable log '{}' aside to '{}'", log.key(), backup);
                        (Vec::new(), false)
                    }
                    Ok(None) => (Vec::new(), false),
                    Err(e) => {
                        error!("Could not set aside log '{}', holding writes: {}", log.key(), e);
                        (Vec::new(), true)
                    }
                }
            }
        };

        info!("Hydrated {} records from '{}'", records.len(), log.key());

        let inner = Arc::new(Mutex::new(Inner::new(records)));
        let shared = inner.clone();
        let snapshot = move || {
            let inner = lock(&shared);
            Snapshot {
                version: inner.version,
                records: inner.records.clone(),
            }
        };

        Self {
            key: log.key().to_string(),
            inner,
            queue: PersistQueue::spawn(log, snapshot, held),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    /// Copy of the current sequence, in insertion order
    pub fn snapshot(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.lock().records.iter().find(|r| r.id() == id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a record and schedule a write
    pub fn append(&self, record: Record) -> Result<PersistTicket, StorageError> {
        let mut inner = self.lock();
        if !inner.ids.insert(record.id().clone()) {
            return Err(StorageError::DuplicateId(record.id().clone()));
        }
        debug!("Appending record {}", record.id());
        inner.records.push(record);
        Ok(self.queue.save(inner.bump()))
    }

    /// Change a record's fields in place and schedule a write
    ///
    /// The closure only sees the fields, so identity cannot change. Returns
    /// `None` when no record has that id.
    pub fn update_fields<F>(&self, id: &RecordId, apply: F) -> Option<(Record, PersistTicket)>
    where
        F: FnOnce(&mut RecordFields),
    {
        let mut inner = self.lock();
        let record = inner.records.iter_mut().find(|r| r.id() == id)?;
        apply(&mut record.fields);
        let updated = record.clone();
        let ticket = self.queue.save(inner.bump());
        Some((updated, ticket))
    }

    /// Remove a record; absent ids change nothing and schedule no write
    pub fn remove(&self, id: &RecordId) -> Option<PersistTicket> {
        let mut inner = self.lock();
        if !inner.ids.remove(id) {
            return None;
        }
        inner.records.retain(|r| r.id() != id);
        debug!("Removed record {}", id);
        Some(self.queue.save(inner.bump()))
    }

    /// Empty the sequence and schedule a write of the empty log
    ///
    /// Unlike [`clear`](Self::clear) the blob stays, holding `[]`.
    pub fn remove_all(&self) -> PersistTicket {
        let mut inner = self.lock();
        let removed = inner.records.len();
        inner.records.clear();
        inner.ids.clear();
        info!("Removed all {} records", removed);
        self.queue.save(inner.bump())
    }

    /// Read the persisted sequence
    ///
    /// Goes through the writer queue, so it observes every write scheduled
    /// before the call.
    pub async fn load(&self) -> Result<Vec<Record>, StorageError> {
        self.queue.load().await
    }

    /// Replace the whole sequence and wait for it to be written
    pub async fn save(&self, records: Vec<Record>) -> Result<(), StorageError> {
        let ticket = {
            let mut inner = self.lock();
            let mut ids = HashSet::with_capacity(records.len());
            if let Some(dup) = records.iter().find(|r| !ids.insert(r.id().clone())) {
                return Err(StorageError::DuplicateId(dup.id().clone()));
            }
            inner.records = records;
            inner.ids = ids;
            self.queue.save(inner.bump())
        };
        ticket.wait().await
    }

    /// Empty the sequence and delete the persisted blob
    pub async fn clear(&self) -> Result<(), StorageError> {
        let ticket = {
            let mut inner = self.lock();
            inner.records.clear();
            inner.ids.clear();
            inner.bump();
            self.queue.clear()
        };
        info!("Cleared record store '{}'", self.key);
        ticket.wait().await
    }

    /// Wait until every write scheduled so far has finished
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.queue.barrier().await
    }
}
