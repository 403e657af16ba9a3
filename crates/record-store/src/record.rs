//! History Records

use chrono::{DateTime, Utc};
use sensor_model::{Reading, RecordFields};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique record identifier, `"{epoch_millis}-{random_fraction}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    /// Appended from a feed reading
    #[default]
    Feed,
    /// Entered by hand
    Manual,
}

/// Persisted history entry
///
/// `id` and `created_at` are fixed at construction; only `fields` may change,
/// and only through an explicit edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    id: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
    created_at: DateTime<Utc>,
    #[serde(default)]
    origin: RecordOrigin,
}

impl Record {
    pub fn new(id: RecordId, fields: RecordFields, created_at: DateTime<Utc>, origin: RecordOrigin) -> Self {
        Self {
            id,
            fields,
            created_at,
            origin,
        }
    }

    /// Record built from a feed reading
    pub fn from_reading(id: RecordId, reading: Reading, created_at: DateTime<Utc>) -> Self {
        Self::new(id, reading.fields, created_at, RecordOrigin::Feed)
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn origin(&self) -> RecordOrigin {
        self.origin
    }
}
