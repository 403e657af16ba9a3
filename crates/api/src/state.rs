//! Shared Application State

use data_validator::{ValidationConfig, Validator};
use metrics_exporter_prometheus::PrometheusHandle;
use reconciler::ReconciliationEngine;
use record_editor::RecordEditor;
use record_store::RecordStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::confirm::ConfirmationTokens;

/// Application state shared across handlers
///
/// Every component synchronizes internally, so handlers share it through a
/// plain `Arc`.
pub struct AppState {
    /// Record log
    pub store: Arc<RecordStore>,
    /// Feed reconciliation, also the source of the live reading
    pub engine: Arc<ReconciliationEngine>,
    /// Validated user edits
    pub editor: RecordEditor,
    /// Pending delete-all confirmations
    pub confirmations: ConfirmationTokens,
    /// Age after which the live reading is flagged stale
    pub stale_after: Duration,
    /// Prometheus exposition, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, validation: ValidationConfig, stale_after: Duration) -> Self {
        Self {
            engine: Arc::new(ReconciliationEngine::new(store.clone())),
            editor: RecordEditor::new(store.clone(), Validator::new(validation)),
            store,
            confirmations: ConfirmationTokens::default(),
            stale_after,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
