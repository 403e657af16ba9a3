//! Reconciliation Engine
//!
//! Turns every delivered [`Reading`] into a new feed [`Record`]. The history
//! is a log: identical consecutive readings still produce separate records,
//! and existing records are never touched.

mod engine;

pub use engine::ReconciliationEngine;

/// Metric names emitted by the engine
pub mod metric {
    /// Feed records appended to the store
    pub const RECORDS_APPENDED: &str = "aqualog_records_appended_total";
    /// Readings delivered by the feed listener
    pub const READINGS_RECEIVED: &str = "aqualog_readings_received_total";
}
