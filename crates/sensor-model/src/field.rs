//! Sensor Field Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields carried by a water-quality reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorField {
    /// Water temperature (°C)
    Temperature,
    /// Total dissolved solids (ppm)
    Tds,
    /// Turbidity, numeric (NTU) or a label such as "low"
    Turbidity,
    /// Water level label such as "High" or "Low"
    WaterLevel,
}

impl SensorField {
    /// Every field, in display order
    pub const ALL: [SensorField; 4] = [
        SensorField::Temperature,
        SensorField::Tds,
        SensorField::Turbidity,
        SensorField::WaterLevel,
    ];

    /// Canonical (persisted) name
    pub fn name(&self) -> &'static str {
        match self {
            SensorField::Temperature => "temperature",
            SensorField::Tds => "tds",
            SensorField::Turbidity => "turbidity",
            SensorField::WaterLevel => "waterLevel",
        }
    }

    /// Display unit, if the field has one
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            SensorField::Temperature => Some("°C"),
            SensorField::Tds => Some("ppm"),
            SensorField::Turbidity | SensorField::WaterLevel => None,
        }
    }

    /// Raw payload keys accepted for this field, most specific first
    pub fn feed_aliases(&self) -> &'static [&'static str] {
        match self {
            SensorField::Temperature => &["temperature", "temp"],
            SensorField::Tds => &["tds"],
            SensorField::Turbidity => &["turbidity"],
            SensorField::WaterLevel => &["waterLevel", "water_level", "level"],
        }
    }

    /// Whether the field only holds numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, SensorField::Temperature | SensorField::Tds)
    }

    /// Whether the field accepts free-text labels
    pub fn accepts_label(&self) -> bool {
        matches!(self, SensorField::Turbidity | SensorField::WaterLevel)
    }

    /// Whether the field accepts numbers
    pub fn accepts_number(&self) -> bool {
        !matches!(self, SensorField::WaterLevel)
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kinds() {
        assert!(SensorField::Temperature.is_numeric());
        assert!(!SensorField::Turbidity.is_numeric());
        assert!(SensorField::Turbidity.accepts_number());
        assert!(SensorField::Turbidity.accepts_label());
        assert!(!SensorField::WaterLevel.accepts_number());
    }

    #[test]
    fn test_aliases_cover_both_feed_variants() {
        assert!(SensorField::Temperature.feed_aliases().contains(&"temp"));
        assert!(SensorField::Temperature.feed_aliases().contains(&"temperature"));
        assert!(SensorField::WaterLevel.feed_aliases().contains(&"waterLevel"));
    }
}
