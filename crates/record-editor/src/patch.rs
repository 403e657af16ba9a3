//! Edit Inputs

use data_validator::FieldInput;
use sensor_model::SensorField;
use serde::{Deserialize, Deserializer, Serialize};

/// Raw inputs for some or all of a record's fields
///
/// Absent fields are left alone by an update and count as missing for a
/// manual entry. An explicit `null` is kept as [`FieldInput::Clear`], which
/// marks the field unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldInputs {
    #[serde(default, alias = "temp", deserialize_with = "explicit", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<FieldInput>,
    #[serde(default, deserialize_with = "explicit", skip_serializing_if = "Option::is_none")]
    pub tds: Option<FieldInput>,
    #[serde(default, deserialize_with = "explicit", skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<FieldInput>,
    #[serde(default, alias = "water_level", deserialize_with = "explicit", skip_serializing_if = "Option::is_none")]
    pub water_level: Option<FieldInput>,
}

/// A key that is present always yields `Some`, even for `null`
fn explicit<'de, D>(deserializer: D) -> Result<Option<FieldInput>, D::Error>
where
    D: Deserializer<'de>,
{
    FieldInput::deserialize(deserializer).map(Some)
}

/// Partial edit of an existing record
pub type RecordPatch = FieldInputs;

/// Manually entered record
pub type ManualEntry = FieldInputs;

impl FieldInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field's input
    pub fn with(mut self, field: SensorField, input: impl Into<FieldInput>) -> Self {
        *self.slot(field) = Some(input.into());
        self
    }

    pub fn get(&self, field: SensorField) -> Option<&FieldInput> {
        match field {
            SensorField::Temperature => self.temperature.as_ref(),
            SensorField::Tds => self.tds.as_ref(),
            SensorField::Turbidity => self.turbidity.as_ref(),
            SensorField::WaterLevel => self.water_level.as_ref(),
        }
    }

    fn slot(&mut self, field: SensorField) -> &mut Option<FieldInput> {
        match field {
            SensorField::Temperature => &mut self.temperature,
            SensorField::Tds => &mut self.tds,
            SensorField::Turbidity => &mut self.turbidity,
            SensorField::WaterLevel => &mut self.water_level,
        }
    }

    /// Present inputs, in display order
    pub fn present(&self) -> impl Iterator<Item = (SensorField, &FieldInput)> {
        SensorField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|input| (field, input)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_present_order() {
        let patch = RecordPatch::new()
            .with(SensorField::WaterLevel, "Low")
            .with(SensorField::Tds, 450);

        let fields: Vec<_> = patch.present().map(|(f, _)| f).collect();
        assert_eq!(fields, vec![SensorField::Tds, SensorField::WaterLevel]);
        assert_eq!(patch.get(SensorField::Tds), Some(&FieldInput::Number(450.0)));
        assert!(RecordPatch::new().is_empty());
    }

    #[test]
    fn test_deserialize_form_and_json_inputs() {
        let patch: RecordPatch = serde_json::from_str(r#"{"temp": "24.5", "tds": 300}"#).unwrap();
        assert_eq!(patch.temperature, Some(FieldInput::Text("24.5".to_string())));
        assert_eq!(patch.tds, Some(FieldInput::Number(300.0)));
        assert_eq!(patch.turbidity, None);

        assert!(serde_json::from_str::<RecordPatch>(r#"{"id": "x"}"#).is_err());
    }

    #[test]
    fn test_null_clears_and_absent_skips() {
        let patch: RecordPatch = serde_json::from_str(r#"{"turbidity": null}"#).unwrap();
        assert_eq!(patch.turbidity, Some(FieldInput::Clear));
        assert_eq!(patch.water_level, None);
        assert!(!patch.is_empty());
    }
}
