use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::models::Provider;
use crate::scoring::ScoreConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// Sleep score constants
    #[serde(default)]
    pub scoring: ScoreConfig,

    /// Payload ingestion preferences
    #[serde(default)]
    pub ingest: IngestSettings,

    /// Calendar display preferences
    #[serde(default)]
    pub display: DisplaySettings,

    /// Logging setup
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Payload ingestion preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Only accept Garmin entries pushed for this access token
    pub garmin_access_token: Option<String>,

    /// Provider whose record is shown first when a day has several
    pub preferred_provider: Option<Provider>,
}

/// Calendar display preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Start calendar weeks on Monday instead of Sunday
    pub week_starts_monday: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            week_starts_monday: true,
        }
    }
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();

        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            scoring: ScoreConfig::default(),
            ingest: IngestSettings::default(),
            display: DisplaySettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

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
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sleeprs")
            .join("config.toml")
    }

    /// Load the default config file, falling back to defaults
    ///
    /// The load error is handed back rather than logged, since this runs
    /// before logging is initialized.
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default_from(Self::default_config_path())
    }

    /// Load `path`, falling back to defaults when it is absent or invalid
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_file(path) {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<PathBuf> {
        let config_path = Self::default_config_path();
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.scoring, deserialized.scoring);
        assert_eq!(config.display, deserialized.display);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [ingest]
            garmin_access_token = "abc"
            preferred_provider = "withings"

            [logging]
            level = "debug"
            format = "json"
            rotation = false
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.ingest.garmin_access_token.as_deref(), Some("abc"));
        assert_eq!(config.ingest.preferred_provider, Some(Provider::Withings));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.scoring, ScoreConfig::default());
        assert!(config.display.week_starts_monday);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.scoring.ideal_duration_secs = 7 * 3600;
        original_config.display.week_starts_monday = false;

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.scoring.ideal_duration_secs, 7 * 3600);
        assert!(!loaded_config.display.week_starts_monday);
    }

    #[test]
    fn test_scoring_only_config_loads() {
        let toml_str = r#"
            [scoring]
            ideal_duration_secs = 27000
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.scoring.ideal_duration_secs, 27_000);
        assert_eq!(config.metadata.version, "1.0");
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_fallback_reports_the_load_error() {
        let temp_dir = tempdir().unwrap();
        let broken = temp_dir.path().join("config.toml");
        fs::write(&broken, "[scoring\nideal_duration_secs = ").unwrap();

        let (config, err) = AppConfig::load_or_default_from(&broken);
        assert_eq!(config.scoring, ScoreConfig::default());
        assert!(err.unwrap().to_string().contains("Failed to parse TOML"));

        let (_, err) = AppConfig::load_or_default_from(temp_dir.path().join("absent.toml"));
        assert!(err.is_some());

        let mut saved = AppConfig::default();
        saved.display.week_starts_monday = false;
        saved.save_to_file(&broken).unwrap();
        let (config, err) = AppConfig::load_or_default_from(&broken);
        assert!(err.is_none());
        assert!(!config.display.week_starts_monday);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        assert!(AppConfig::load_from_file(temp_dir.path().join("absent.toml")).is_err());
    }
}
