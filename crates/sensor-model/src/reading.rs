//! Readings and Record Field Sets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FieldValue, SensorField};

/// The four sensor values shared by readings and persisted records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    #[serde(default)]
    pub temperature: FieldValue,
    #[serde(default)]
    pub tds: FieldValue,
    #[serde(default)]
    pub turbidity: FieldValue,
    #[serde(default)]
    pub water_level: FieldValue,
}

impl RecordFields {
    /// All fields unavailable
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn get(&self, field: SensorField) -> &FieldValue {
        match field {
            SensorField::Temperature => &self.temperature,
            SensorField::Tds => &self.tds,
            SensorField::Turbidity => &self.turbidity,
            SensorField::WaterLevel => &self.water_level,
        }
    }

    pub fn set(&mut self, field: SensorField, value: FieldValue) {
        match field {
            SensorField::Temperature => self.temperature = value,
            SensorField::Tds => self.tds = value,
            SensorField::Turbidity => self.turbidity = value,
            SensorField::WaterLevel => self.water_level = value,
        }
    }

    /// Iterate fields in display order
    pub fn iter(&self) -> impl Iterator<Item = (SensorField, &FieldValue)> {
        SensorField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Number of fields holding a value
    pub fn available_count(&self) -> usize {
        self.iter().filter(|(_, v)| v.is_available()).count()
    }
}

/// Snapshot of sensor values pushed by the remote feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(flatten)]
    pub fields: RecordFields,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(fields: RecordFields, observed_at: DateTime<Utc>) -> Self {
        Self { fields, observed_at }
    }

    /// Reading with every field unavailable
    pub fn unavailable(observed_at: DateTime<Utc>) -> Self {
        Self::new(RecordFields::unavailable(), observed_at)
    }

    /// Merge a single-field update, keeping every other field as it was
    pub fn merge_field(&mut self, field: SensorField, value: FieldValue, observed_at: DateTime<Utc>) {
        self.fields.set(field, value);
        self.observed_at = observed_at;
    }

    /// Age of this reading relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.observed_at
    }
}
