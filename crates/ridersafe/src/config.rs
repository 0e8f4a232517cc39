//! Configuration management for ridersafe.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "ridersafe";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ridersafe.db";

/// Public page that shows a rider's emergency card.
const DEFAULT_STATUS_URL: &str = "https://giacomo-beta.vercel.app/status.html";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RIDERSAFE_`, nested with `__`)
/// 2. TOML config file at `~/.config/ridersafe/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Admin board configuration.
    pub admin: AdminConfig,
    /// Crash alert configuration.
    pub alert: AlertConfig,
    /// Public status page configuration.
    pub status: StatusConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/ridersafe/ridersafe.db`
    pub database_path: Option<PathBuf>,
}

/// Admin-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Email that always lands on the admin board, whatever its stored role.
    pub admin_email: Option<String>,
    /// Merge the fixed demo riders into the admin board.
    pub include_demo_riders: bool,
}

/// Crash alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds the rider has to cancel before the alert is sent.
    pub countdown_seconds: u32,
    /// Length of one countdown tick in milliseconds.
    pub tick_interval_ms: u64,
}

/// Status page configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Base URL encoded into rider QR codes.
    pub base_url: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 10,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATUS_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("RIDERSAFE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.alert.countdown_seconds == 0 {
            return Err(Error::ConfigValidation {
                message: "countdown_seconds must be greater than 0".to_string(),
            });
        }

        if self.alert.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "tick_interval_ms must be greater than 0".to_string(),
            });
        }

        if url::Url::parse(&self.status.base_url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid status base_url: {}", self.status.base_url),
            });
        }

        if let Some(email) = &self.admin.admin_email {
            if !email.contains('@') {
                return Err(Error::ConfigValidation {
                    message: format!("invalid admin_email: {email}"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the countdown tick as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.alert.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(config.admin.admin_email.is_none());
        assert!(!config.admin.include_demo_riders);
        assert_eq!(config.alert.countdown_seconds, 10);
        assert_eq!(config.alert.tick_interval_ms, 1000);
        assert_eq!(config.status.base_url, DEFAULT_STATUS_URL);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_countdown() {
        let mut config = Config::default();
        config.alert.countdown_seconds = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("countdown_seconds"));
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.alert.tick_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms"));
    }

    #[test]
    fn test_validate_bad_status_url() {
        let mut config = Config::default();
        config.status.base_url = "status.html".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_bad_admin_email() {
        let mut config = Config::default();
        config.admin.admin_email = Some("admin".to_string());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("admin_email"));

        config.admin.admin_email = Some("admin@example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("ridersafe.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_tick_interval() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("ridersafe"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("ridersafe_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[admin]\nadmin_email = \"ops@example.com\"\n\n[alert]\ncountdown_seconds = 5\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.admin.admin_email.as_deref(), Some("ops@example.com"));
        assert_eq!(config.alert.countdown_seconds, 5);
        assert_eq!(config.alert.tick_interval_ms, 1000);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_alert_config_deserialize() {
        let json = r#"{"countdown_seconds": 3}"#;
        let alert: AlertConfig = serde_json::from_str(json).unwrap();
        assert_eq!(alert.countdown_seconds, 3);
        assert_eq!(alert.tick_interval_ms, 1000);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("countdown_seconds"));
        assert!(json.contains("base_url"));
    }
}
