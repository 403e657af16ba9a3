//! Feed-to-Store Engine

use chrono::Utc;
use record_store::{IdGenerator, Record, RecordStore, StorageError, MAX_ID_ATTEMPTS};
use sensor_model::Reading;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, warn};

use crate::metric;

/// Appends one record per delivered reading
///
/// The append is synchronous with the delivery; the durable write is
/// scheduled and not awaited, and its failure never rolls the append back.
pub struct ReconciliationEngine {
    store: Arc<RecordStore>,
    ids: IdGenerator,
    latest: Mutex<Option<Reading>>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self::with_id_generator(store, IdGenerator::new())
    }

    pub fn with_id_generator(store: Arc<RecordStore>, ids: IdGenerator) -> Self {
        Self {
            store,
            ids,
            latest: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn latest_slot(&self) -> MutexGuard<'_, Option<Reading>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Most recent reading, if any has arrived yet
    pub fn latest(&self) -> Option<Reading> {
        self.latest_slot().clone()
    }

    /// Append `reading` as a new feed record
    ///
    /// An id that collides with a stored record is regenerated.
    pub fn on_reading(&self, reading: Reading) -> Result<Record, StorageError> {
        metrics::counter!(metric::READINGS_RECEIVED).increment(1);
        *self.latest_slot() = Some(reading.clone());

        let mut attempts = 0;
        loop {
            attempts += 1;
            let record = Record::from_reading(self.ids.next_id(), reading.clone(), Utc::now());
            match self.store.append(record.clone()) {
                Ok(ticket) => {
                    // Fire and forget; the writer logs failures
                    drop(ticket);
                    metrics::counter!(metric::RECORDS_APPENDED).increment(1);
                    debug!("Reconciled reading into record {}", record.id());
                    return Ok(record);
                }
                Err(StorageError::DuplicateId(id)) if attempts < MAX_ID_ATTEMPTS => {
                    warn!("Record id {} collided, regenerating", id);
                }
                Err(e) => {
                    error!("Failed to append reading: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
