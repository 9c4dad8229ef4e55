//! Application configuration loaded from TOML.

use crate::geo::LAT_TILE_SIZE_DEGREES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Grid and fix filtering
    pub tracking: TrackingSettings,
    /// Persistence debounce and timeouts
    pub sync: SyncSettings,
    /// Storage locations
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracking: TrackingSettings::default(),
            sync: SyncSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

/// Tracking-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Latitude pitch of one exploration tile in degrees
    pub lat_tile_size_degrees: f64,
    /// Fixes reporting a worse accuracy than this are dropped
    pub max_accuracy_meters: f64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            lat_tile_size_degrees: LAT_TILE_SIZE_DEGREES,
            max_accuracy_meters: 50.0,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Quiet period before a burst of changes is written
    pub debounce_ms: u64,
    /// Upper bound on a single write
    pub write_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            write_timeout_secs: 30,
        }
    }
}

impl SyncSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl StorageSettings {
    /// Path of the local SQLite store.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(super::schema::DATABASE_FILE)
    }
}

impl AppConfig {
    /// Check values that would break the grid or the debounce timer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.tracking.lat_tile_size_degrees;
        if !(size.is_finite() && size > 0.0 && size <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "tracking.lat_tile_size_degrees must be in (0, 1], got {}",
                size
            )));
        }
        let accuracy = self.tracking.max_accuracy_meters;
        if accuracy.is_nan() || accuracy <= 0.0 {
            return Err(ConfigError::Invalid(
                "tracking.max_accuracy_meters must be positive".to_string(),
            ));
        }
        if self.sync.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.write_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "fogwalker", "Fogwalker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path inside a data directory.
pub fn get_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration from `data_dir` (platform default when `None`).
///
/// A missing file yields defaults.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let data_dir = data_dir.map(Path::to_path_buf).unwrap_or_else(get_data_dir);
    let path = get_config_path(&data_dir);

    let mut config = if path.exists() {
        let content =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        AppConfig::default()
    };

    config.storage.data_dir = data_dir;
    config.validate()?;

    Ok(config)
}

/// Save configuration into its data directory.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = get_config_path(&config.storage.data_dir);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
