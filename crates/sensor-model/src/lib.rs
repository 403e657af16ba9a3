//! Sensor Model
//!
//! Canonical schema shared by every aqualog component. Raw feed field names
//! (`temp`, `water_level`, ...) never leave the feed listener; everything
//! downstream speaks in terms of [`SensorField`] and [`FieldValue`].

mod field;
mod reading;
mod value;

pub use field::SensorField;
pub use reading::{Reading, RecordFields};
pub use value::FieldValue;

/// Current wall-clock time as Unix milliseconds
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
