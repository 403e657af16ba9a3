//! Daemon Configuration
//!
//! Layered as: built-in defaults, then an optional `aqualog.toml`, then
//! `AQUALOG__SECTION__KEY` environment variables.

use config::{Config, Environment, File};
use data_validator::ValidationConfig;
use feed_listener::{FeedShape, MqttConfig};
use sensor_model::SensorField;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ApiError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub feed: FeedSettings,
    pub dashboard: DashboardSettings,
    pub validation: ValidationConfig,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one file per storage key
    pub data_dir: PathBuf,
    /// Key the record log is stored under
    pub key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            key: record_store::DEFAULT_STORE_KEY.to_string(),
        }
    }
}

/// Which feed source to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Simulated,
    Mqtt,
    /// No live feed; records come from manual entry only
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Composite,
    Split,
}

/// Channel names for the one-channel-per-field layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitChannels {
    pub temperature: String,
    pub tds: String,
    pub water_level: String,
}

impl Default for SplitChannels {
    fn default() -> Self {
        Self {
            temperature: "Temperature".to_string(),
            tds: "TDS".to_string(),
            water_level: "WaterLevel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub kind: FeedKind,
    pub shape: ShapeKind,
    /// Composite channel name
    pub channel: String,
    pub split: SplitChannels,
    /// Simulator period (milliseconds)
    pub simulated_interval_ms: u64,
    pub mqtt: MqttConfig,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            kind: FeedKind::Simulated,
            shape: ShapeKind::Composite,
            channel: "water".to_string(),
            split: SplitChannels::default(),
            simulated_interval_ms: feed_listener::DEFAULT_SIMULATION_INTERVAL.as_millis() as u64,
            mqtt: MqttConfig::default(),
        }
    }
}

impl FeedSettings {
    pub fn shape(&self) -> FeedShape {
        match self.shape {
            ShapeKind::Composite => FeedShape::composite(self.channel.clone()),
            ShapeKind::Split => FeedShape::split([
                (self.split.temperature.clone(), SensorField::Temperature),
                (self.split.tds.clone(), SensorField::Tds),
                (self.split.water_level.clone(), SensorField::WaterLevel),
            ]),
        }
    }

    pub fn simulated_interval(&self) -> Duration {
        Duration::from_millis(self.simulated_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// A live reading older than this is flagged stale (seconds)
    pub stale_after_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self { stale_after_secs: 30 }
    }
}

impl DashboardSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// Load settings; `path` must exist when given, `aqualog.toml` is optional
    pub fn load(path: Option<&Path>) -> Result<Self, ApiError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("aqualog").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("AQUALOG").separator("__").try_parsing(true))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ApiError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.storage.key, "records");
        assert_eq!(settings.feed.kind, FeedKind::Simulated);
        assert_eq!(settings.feed.simulated_interval(), Duration::from_secs(5));
        assert_eq!(settings.feed.shape(), FeedShape::composite("water"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "0.0.0.0:9000"

[feed]
kind = "none"
shape = "split"

[feed.split]
tds = "tds_ppm"

[dashboard]
stale_after_secs = 10
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:9000");
        assert_eq!(settings.feed.kind, FeedKind::Disabled);
        assert_eq!(settings.dashboard.stale_after(), Duration::from_secs(10));
        assert_eq!(settings.storage.key, "records");

        let FeedShape::Split { channels } = settings.feed.shape() else {
            panic!("expected split shape");
        };
        assert_eq!(channels[1], ("tds_ppm".to_string(), SensorField::Tds));
        assert_eq!(channels[0].0, "Temperature");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/aqualog.toml")));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
