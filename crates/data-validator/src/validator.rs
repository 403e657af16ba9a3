//! Field Validator

use crate::error::ValidationError;
use crate::input::FieldInput;
use sensor_model::{FieldValue, SensorField};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Temperature valid range (°C)
    pub temperature_range: (f64, f64),
    /// TDS valid range (ppm)
    pub tds_range: (f64, f64),
    /// Numeric turbidity valid range (NTU)
    pub turbidity_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            temperature_range: (-50.0, 150.0),
            tds_range: (0.0, 100_000.0),
            turbidity_range: (0.0, 4_000.0),
        }
    }
}

/// Validator for manually entered sensor values
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Parse one input into the field's semantic type
    ///
    /// [`FieldInput::Clear`] parses to [`FieldValue::Unavailable`] for every
    /// field; the "N/A" label itself is rejected.
    pub fn parse(&self, field: SensorField, input: &FieldInput) -> Result<FieldValue, ValidationError> {
        if input.is_blank() {
            return Err(ValidationError::MissingField(field));
        }

        let value = match (field, input) {
            (_, FieldInput::Clear) => FieldValue::Unavailable,
            (SensorField::Temperature | SensorField::Tds, _) => {
                FieldValue::Number(self.parse_number(field, input)?)
            }
            (SensorField::Turbidity, FieldInput::Text(text)) if parse_finite(text).is_none() => {
                FieldValue::Text(self.parse_label(field, text)?)
            }
            (SensorField::Turbidity, _) => FieldValue::Number(self.parse_number(field, input)?),
            (SensorField::WaterLevel, FieldInput::Text(text)) => {
                FieldValue::Text(self.parse_label(field, text)?)
            }
            (SensorField::WaterLevel, FieldInput::Number(_)) => {
                return Err(ValidationError::InvalidLabel {
                    field,
                    raw: input.raw(),
                })
            }
        };

        debug!("Parsed {} input {:?} as {:?}", field, input, value);
        Ok(value)
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: SensorField,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn range_for(&self, field: SensorField) -> Option<(f64, f64)> {
        match field {
            SensorField::Temperature => Some(self.config.temperature_range),
            SensorField::Tds => Some(self.config.tds_range),
            SensorField::Turbidity => Some(self.config.turbidity_range),
            SensorField::WaterLevel => None,
        }
    }

    fn parse_number(&self, field: SensorField, input: &FieldInput) -> Result<f64, ValidationError> {
        let value = match input {
            FieldInput::Number(n) if n.is_finite() => Some(*n),
            FieldInput::Number(_) => None,
            FieldInput::Text(text) => parse_finite(text),
            FieldInput::Clear => None,
        }
        .ok_or_else(|| ValidationError::InvalidNumber {
            field,
            raw: input.raw(),
        })?;

        if let Some(range) = self.range_for(field) {
            self.validate_range(field, value, range)?;
        }
        Ok(value)
    }

    fn parse_label(&self, field: SensorField, text: &str) -> Result<String, ValidationError> {
        let label = text.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(FieldValue::UNAVAILABLE_LABEL) {
            return Err(ValidationError::InvalidLabel {
                field,
                raw: text.to_string(),
            });
        }
        Ok(label.to_string())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

/// Parse trimmed text as a finite float; "nan" and "inf" are rejected
fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numeric_fields() {
        let validator = Validator::default();
        assert_eq!(
            validator.parse(SensorField::Temperature, &"24.3".into()),
            Ok(FieldValue::Number(24.3))
        );
        assert_eq!(
            validator.parse(SensorField::Tds, &450.into()),
            Ok(FieldValue::Number(450.0))
        );
        assert!(matches!(
            validator.parse(SensorField::Tds, &"lots".into()),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert!(matches!(
            validator.parse(SensorField::Temperature, &"NaN".into()),
            Err(ValidationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let validator = Validator::default();
        assert!(matches!(
            validator.parse(SensorField::Tds, &(-5).into()),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validator.parse(SensorField::Temperature, &150.into()).is_ok());
        assert!(validator.parse(SensorField::Temperature, &151.into()).is_err());
    }

    #[test]
    fn test_turbidity_accepts_number_or_label() {
        let validator = Validator::default();
        assert_eq!(
            validator.parse(SensorField::Turbidity, &" low ".into()),
            Ok(FieldValue::Text("low".to_string()))
        );
        assert_eq!(
            validator.parse(SensorField::Turbidity, &"12.5".into()),
            Ok(FieldValue::Number(12.5))
        );
    }

    #[test]
    fn test_water_level_is_a_label() {
        let validator = Validator::default();
        assert_eq!(
            validator.parse(SensorField::WaterLevel, &"High".into()),
            Ok(FieldValue::Text("High".to_string()))
        );
        assert!(matches!(
            validator.parse(SensorField::WaterLevel, &3.into()),
            Err(ValidationError::InvalidLabel { .. })
        ));
        assert!(matches!(
            validator.parse(SensorField::WaterLevel, &"N/A".into()),
            Err(ValidationError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_blank_is_missing() {
        let validator = Validator::default();
        assert_eq!(
            validator.parse(SensorField::Tds, &"   ".into()),
            Err(ValidationError::MissingField(SensorField::Tds))
        );
    }

    #[test]
    fn test_input_deserializes_untagged() {
        let inputs: Vec<FieldInput> = serde_json::from_str(r#"[450, "Low", null]"#).unwrap();
        assert_eq!(inputs[0], FieldInput::Number(450.0));
        assert_eq!(inputs[1], FieldInput::Text("Low".to_string()));
        assert_eq!(inputs[2], FieldInput::Clear);
    }

    #[test]
    fn test_clear_is_unavailable() {
        let validator = Validator::default();
        for field in SensorField::ALL {
            assert_eq!(validator.parse(field, &FieldInput::Clear), Ok(FieldValue::Unavailable));
        }
    }

    proptest! {
        #[test]
        fn prop_in_range_temperature_text_parses(value in -50.0f64..=150.0) {
            let validator = Validator::default();
            let parsed = validator
                .parse(SensorField::Temperature, &FieldInput::Text(value.to_string()))
                .unwrap();
            prop_assert_eq!(parsed, FieldValue::Number(value));
        }
    }
}
