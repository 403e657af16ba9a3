//! Payload Normalization
//!
//! The only place raw feed field names are interpreted. Anything ambiguous
//! becomes [`FieldValue::Unavailable`]; nothing is ever coerced to `0`.

use chrono::{DateTime, Utc};
use sensor_model::{FieldValue, Reading, RecordFields, SensorField};
use serde_json::Value;
use tracing::debug;

use crate::FeedError;

/// Labels feeds use to mean "no value"
const UNAVAILABLE_MARKERS: [&str; 3] = ["n/a", "na", "loading..."];

/// Normalize one raw value for a field
pub fn normalize_field(field: SensorField, raw: Option<&Value>) -> FieldValue {
    let value = match raw {
        None | Some(Value::Null) => return FieldValue::Unavailable,
        Some(Value::Number(n)) if field.accepts_number() => {
            n.as_f64().filter(|v| v.is_finite()).map(FieldValue::Number)
        }
        Some(Value::String(s)) => normalize_text(field, s),
        Some(_) => None,
    };

    value.unwrap_or_else(|| {
        debug!("Field {} degraded to unavailable: {:?}", field, raw);
        FieldValue::Unavailable
    })
}

fn normalize_text(field: SensorField, text: &str) -> Option<FieldValue> {
    let text = text.trim();
    if text.is_empty() || UNAVAILABLE_MARKERS.contains(&text.to_ascii_lowercase().as_str()) {
        return None;
    }

    let number = text.parse::<f64>().ok().filter(|v| v.is_finite());
    match field {
        SensorField::Temperature | SensorField::Tds => number.map(FieldValue::Number),
        SensorField::Turbidity => Some(
            number
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(text.to_string())),
        ),
        SensorField::WaterLevel => Some(FieldValue::Text(text.to_string())),
    }
}

/// Find the raw value for a field in an object payload, trying each alias
pub fn lookup<'a>(field: SensorField, payload: &'a Value) -> Option<&'a Value> {
    let object = payload.as_object()?;
    field
        .feed_aliases()
        .iter()
        .find_map(|alias| object.get(*alias))
}

/// Raw value for a single-field channel: either the bare value, or an
/// object carrying the field under one of its aliases
pub fn extract_partial<'a>(field: SensorField, payload: &'a Value) -> Option<&'a Value> {
    match payload {
        Value::Object(_) => lookup(field, payload),
        other => Some(other),
    }
}

/// Normalize a composite payload carrying every field at once
///
/// `Ok(None)` means the channel holds no data yet (a `null` payload). A
/// payload that is not an object is an error; callers degrade it to an
/// all-unavailable reading.
pub fn normalize_composite(
    channel: &str,
    payload: &Value,
    observed_at: DateTime<Utc>,
) -> Result<Option<Reading>, FeedError> {
    match payload {
        Value::Null => Ok(None),
        Value::Object(_) => {
            let mut fields = RecordFields::unavailable();
            for field in SensorField::ALL {
                fields.set(field, normalize_field(field, lookup(field, payload)));
            }
            Ok(Some(Reading::new(fields, observed_at)))
        }
        other => Err(FeedError::MalformedPayload {
            channel: channel.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}
