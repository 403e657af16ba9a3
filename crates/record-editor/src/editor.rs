//! Record CRUD

use chrono::Utc;
use data_validator::{ValidationError, Validator};
use record_store::{IdGenerator, Record, RecordId, RecordOrigin, RecordStore, StorageError, MAX_ID_ATTEMPTS};
use sensor_model::{FieldValue, RecordFields, SensorField};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{EditError, ManualEntry, RecordPatch};

/// Validated edits against a shared [`RecordStore`]
///
/// Writes are awaited so callers learn whether they were persisted. A failed
/// write leaves the in-memory change in place and returns
/// [`EditError::Storage`].
pub struct RecordEditor {
    store: Arc<RecordStore>,
    validator: Validator,
    ids: IdGenerator,
}

impl RecordEditor {
    pub fn new(store: Arc<RecordStore>, validator: Validator) -> Self {
        Self::with_id_generator(store, validator, IdGenerator::new())
    }

    pub fn with_id_generator(store: Arc<RecordStore>, validator: Validator, ids: IdGenerator) -> Self {
        Self { store, validator, ids }
    }

    /// Add a manually entered record
    ///
    /// Temperature and TDS are required, plus turbidity or water level. A
    /// cleared required field counts as missing.
    pub async fn create(&self, entry: ManualEntry) -> Result<Record, EditError> {
        let mut fields = RecordFields::unavailable();
        for field in [SensorField::Temperature, SensorField::Tds] {
            let input = entry.get(field).ok_or(ValidationError::MissingField(field))?;
            let value = self.validator.parse(field, input)?;
            if !value.is_available() {
                return Err(ValidationError::MissingField(field).into());
            }
            fields.set(field, value);
        }
        for field in [SensorField::Turbidity, SensorField::WaterLevel] {
            if let Some(input) = entry.get(field) {
                fields.set(field, self.validator.parse(field, input)?);
            }
        }
        if !fields.turbidity.is_available() && !fields.water_level.is_available() {
            return Err(ValidationError::MissingField(SensorField::Turbidity).into());
        }

        let mut attempts = 0;
        let (record, ticket) = loop {
            attempts += 1;
            let record = Record::new(self.ids.next_id(), fields.clone(), Utc::now(), RecordOrigin::Manual);
            match self.store.append(record.clone()) {
                Ok(ticket) => break (record, ticket),
                Err(StorageError::DuplicateId(id)) if attempts < MAX_ID_ATTEMPTS => {
                    warn!("Record id {} collided, regenerating", id)
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!("Created manual record {}", record.id());
        ticket.wait().await?;
        Ok(record)
    }

    /// Apply a partial edit to an existing record
    ///
    /// Every present field is validated first; one bad field rejects the
    /// whole patch. `id`, `createdAt` and origin never change.
    pub async fn update(&self, id: &RecordId, patch: RecordPatch) -> Result<Record, EditError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let parsed = patch
            .present()
            .map(|(field, input)| Ok((field, self.validator.parse(field, input)?)))
            .collect::<Result<Vec<(SensorField, FieldValue)>, ValidationError>>()?;

        let (record, ticket) = self
            .store
            .update_fields(id, |fields| {
                for (field, value) in parsed {
                    fields.set(field, value);
                }
            })
            .ok_or_else(|| EditError::NotFound(id.clone()))?;

        info!("Updated record {}", id);
        ticket.wait().await?;
        Ok(record)
    }

    /// Remove a record; an absent id is not an error
    pub async fn delete(&self, id: &RecordId) -> Result<(), EditError> {
        match self.store.remove(id) {
            Some(ticket) => {
                info!("Deleted record {}", id);
                ticket.wait().await?;
            }
            None => info!("Delete of absent record {} ignored", id),
        }
        Ok(())
    }

    /// Remove every record and persist the empty log
    ///
    /// Confirmation is the caller's job.
    pub async fn delete_all(&self) -> Result<(), EditError> {
        self.store.remove_all().wait().await?;
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> Result<Record, EditError> {
        self.store.get(id).ok_or_else(|| EditError::NotFound(id.clone()))
    }

    /// Every record, in history order
    pub fn list(&self) -> Vec<Record> {
        self.store.snapshot()
    }
}
