//! Field Values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SensorField;

/// Value of one sensor field
///
/// Serialized untagged, so a persisted record keeps numbers as JSON numbers,
/// labels as JSON strings, and the unavailable marker as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric measurement
    Number(f64),
    /// Label such as "High" or "low"
    Text(String),
    /// Field missing or not trustworthy
    #[default]
    Unavailable,
}

impl FieldValue {
    /// Marker shown for unavailable values
    pub const UNAVAILABLE_LABEL: &'static str = "N/A";

    pub fn is_available(&self) -> bool {
        !matches!(self, FieldValue::Unavailable)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Format for display, appending the field's unit when available
    pub fn display_for(&self, field: SensorField) -> String {
        match (self, field.unit()) {
            (FieldValue::Unavailable, _) => Self::UNAVAILABLE_LABEL.to_string(),
            (value, Some(unit)) => format!("{} {}", value, unit),
            (value, None) => value.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Unavailable => f.write_str(Self::UNAVAILABLE_LABEL),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}
