//! Validation Error Types

use sensor_model::SensorField;
use thiserror::Error;

/// Errors during input validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Required field absent or blank
    #[error("Missing required field: {0}")]
    MissingField(SensorField),

    /// Numeric field given something that is not a finite number
    #[error("{field} must be a number, got {raw:?}")]
    InvalidNumber { field: SensorField, raw: String },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: SensorField,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Label field given an unusable value
    #[error("{field} must be a non-empty label, got {raw:?}")]
    InvalidLabel { field: SensorField, raw: String },

    /// Edit with nothing to change
    #[error("Patch contains no fields")]
    EmptyPatch,
}

impl ValidationError {
    /// The field the error refers to, if any
    pub fn field(&self) -> Option<SensorField> {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::InvalidNumber { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidLabel { field, .. } => Some(*field),
            ValidationError::EmptyPatch => None,
        }
    }
}
