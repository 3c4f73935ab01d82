use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::middleware::RetryPolicy;
use crate::training_load::LoadConfig;

const CONFIG_DIR: &str = ".recoveryrs";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache recovery status per user until the next write
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Application metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Acute/chronic window settings
    #[serde(default)]
    pub load: LoadConfig,

    /// Retry behaviour for storage operations
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub logging: LogConfig,
}

fn default_cache_enabled() -> bool {
    true
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// SQLite file; relative paths resolve against `data_dir`
    pub database_path: PathBuf,

    /// User assumed when the CLI is not given one
    pub default_user_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            cache_enabled: default_cache_enabled(),
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings::default(),
            load: LoadConfig::default(),
            retry: RetryPolicy::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: config_root(),
            database_path: PathBuf::from("recovery.db"),
            default_user_id: None,
        }
    }
}

fn config_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        config_root().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %config_path.display(), error = %err, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Resolved location of the SQLite database
    pub fn database_file(&self) -> PathBuf {
        if self.settings.database_path.is_absolute() {
            self.settings.database_path.clone()
        } else {
            self.settings.data_dir.join(&self.settings.database_path)
        }
    }

    /// Reject window settings the load calculator cannot use
    pub fn validate(&self) -> Result<()> {
        if self.load.acute_window_days == 0 || self.load.chronic_window_days == 0 {
            anyhow::bail!("Load windows must be at least one day");
        }
        if self.load.acute_window_days > self.load.chronic_window_days {
            anyhow::bail!(
                "Acute window ({} days) must not exceed chronic window ({} days)",
                self.load.acute_window_days,
                self.load.chronic_window_days
            );
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("Retry policy needs at least one attempt");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.load, deserialized.load);
        assert_eq!(config.retry, deserialized.retry);
        assert!(deserialized.cache_enabled);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.settings.default_user_id = Some("athlete-7".to_string());
        original_config.load.acute_window_days = 5;

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.settings.default_user_id.as_deref(), Some("athlete-7"));
        assert_eq!(loaded_config.load.acute_window_days, 5);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [settings]
            data_dir = "/tmp/recovery"
            database_path = "recovery.db"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.load, LoadConfig::default());
        assert!(config.cache_enabled);
        assert_eq!(config.database_file(), PathBuf::from("/tmp/recovery/recovery.db"));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.load.acute_window_days = 30;
        config.save_to_file(&config_path).unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }
}
