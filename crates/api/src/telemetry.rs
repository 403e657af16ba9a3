//! Logging and Metrics Bootstrap

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

use crate::settings::{LogFormat, LogSettings};
use crate::ApiError;

/// Initialize logging
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(settings: &LogSettings) -> Result<(), ApiError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ApiError::Config(format!("invalid log level {:?}: {}", settings.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| ApiError::Startup(format!("failed to set tracing subscriber: {}", e)))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, ApiError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Startup(format!("failed to install metrics recorder: {}", e)))
}
