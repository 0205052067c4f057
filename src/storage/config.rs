//! Application configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Database file name inside the data directory
    pub database_file: String,
    /// Sensor settings
    pub sensors: SensorSettings,
    /// Demo account settings
    pub account: AccountSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            database_file: "fitquest.db".to_string(),
            sensors: SensorSettings::default(),
            account: AccountSettings::default(),
        }
    }
}

impl AppConfig {
    /// Full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Sensor-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSettings {
    /// Use the simulated pedometer instead of a device sensor
    pub simulate: bool,
    /// Poll interval in seconds when running continuously
    pub poll_interval_secs: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            simulate: true,
            poll_interval_secs: 300,
        }
    }
}

/// Demo account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Email used to look up or create the local account
    pub email: String,
    /// Display name for the account and its character
    pub display_name: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            email: "player@fitquest.local".to_string(),
            display_name: "Player".to_string(),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "fitquest", "FitQuest")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from file.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = get_config_path();

    if !path.exists() {
        let config = AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        return Ok(config);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save application configuration to file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = get_config_path();

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database_file, "fitquest.db");
        assert!(config.sensors.simulate);
        assert_eq!(config.account.display_name, "Player");
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/fitquest"),
            ..Default::default()
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.database_file, config.database_file);
        assert_eq!(parsed.sensors.poll_interval_secs, 300);
        // data_dir is resolved at load time, not persisted
        assert_eq!(parsed.data_dir, PathBuf::new());
    }
}
