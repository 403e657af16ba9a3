//! Live Reading Route

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use sensor_model::{FieldValue, Reading};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// One field as shown on the dashboard
#[derive(Debug, Serialize)]
pub struct FieldView {
    pub field: &'static str,
    pub value: FieldValue,
    pub display: String,
}

/// Dashboard view of the most recent reading
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LiveReading {
    /// No reading has arrived since startup
    Loading,
    Live {
        observed_at: DateTime<Utc>,
        age_seconds: i64,
        stale: bool,
        fields: Vec<FieldView>,
    },
}

impl LiveReading {
    pub fn from_reading(reading: &Reading, now: DateTime<Utc>, stale_after: std::time::Duration) -> Self {
        let age = reading.age(now);
        let stale = age.to_std().map(|age| age > stale_after).unwrap_or(false);
        let fields = reading
            .fields
            .iter()
            .map(|(field, value)| FieldView {
                field: field.name(),
                value: value.clone(),
                display: value.display_for(field),
            })
            .collect();

        LiveReading::Live {
            observed_at: reading.observed_at,
            age_seconds: age.num_seconds(),
            stale,
            fields,
        }
    }
}

/// Latest reading handler
pub async fn latest(State(state): State<Arc<AppState>>) -> Json<LiveReading> {
    let view = match state.engine.latest() {
        Some(reading) => LiveReading::from_reading(&reading, Utc::now(), state.stale_after),
        None => LiveReading::Loading,
    };
    Json(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_model::RecordFields;
    use std::time::Duration;

    #[test]
    fn test_display_strings_and_staleness() {
        let now = Utc::now();
        let reading = Reading::new(
            RecordFields {
                temperature: FieldValue::Number(24.3),
                tds: FieldValue::Number(310.0),
                ..Default::default()
            },
            now - chrono::Duration::seconds(45),
        );

        let LiveReading::Live { stale, fields, .. } =
            LiveReading::from_reading(&reading, now, Duration::from_secs(30))
        else {
            panic!("expected a live reading");
        };
        assert!(stale);
        assert_eq!(fields[0].display, "24.3 °C");
        assert_eq!(fields[1].display, "310 ppm");
        assert_eq!(fields[2].display, "N/A");

        let fresh = LiveReading::from_reading(&reading, now, Duration::from_secs(60));
        assert!(matches!(fresh, LiveReading::Live { stale: false, .. }));
    }
}
