//! Configuration for hypnocycle.

use crate::core::error::{ensure_positive, AnalysisError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Thresholds for cycle detection, all in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// NREM runs must be strictly longer than this to qualify
    pub min_length: f64,

    /// Gaps strictly longer than this between qualifying runs start a new cycle
    pub min_separation: f64,

    /// Wake entries strictly longer than this are long awakenings
    pub wake_thresh: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_length: 10.0,
            min_separation: 10.0,
            wake_thresh: 2.0,
        }
    }
}

impl CycleConfig {
    /// Check that every threshold is a positive number of minutes.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        ensure_positive("min_length", self.min_length)?;
        ensure_positive("min_separation", self.min_separation)?;
        ensure_positive("wake_thresh", self.wake_thresh)?;
        Ok(())
    }

    /// Return a copy with any provided thresholds replaced.
    pub fn with_overrides(
        mut self,
        min_length: Option<f64>,
        min_separation: Option<f64>,
        wake_thresh: Option<f64>,
    ) -> Self {
        if let Some(v) = min_length {
            self.min_length = v;
        }
        if let Some(v) = min_separation {
            self.min_separation = v;
        }
        if let Some(v) = wake_thresh {
            self.wake_thresh = v;
        }
        self
    }
}

/// Main configuration, persisted between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Detection thresholds
    pub detection: CycleConfig,

    /// Default directory for exported tables and reports
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hypnocycle");

        Self {
            detection: CycleConfig::default(),
            export_path: data_dir.join("exports"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hypnocycle")
            .join("config.json")
    }

    /// Ensure the export directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detection.min_length, 10.0);
        assert_eq!(config.detection.min_separation, 10.0);
        assert_eq!(config.detection.wake_thresh, 2.0);
        assert!(config.detection.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let config = CycleConfig {
            min_length: 0.0,
            ..CycleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        let config = CycleConfig {
            wake_thresh: -2.0,
            ..CycleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = CycleConfig::default().with_overrides(Some(15.0), None, Some(5.0));
        assert_eq!(config.min_length, 15.0);
        assert_eq!(config.min_separation, 10.0);
        assert_eq!(config.wake_thresh, 5.0);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detection, config.detection);
        assert_eq!(back.export_path, config.export_path);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = std::env::temp_dir().join("hypnocycle_test_config_roundtrip");
        let path = dir.join("config.json");
        let _ = std::fs::remove_dir_all(&dir);

        // A missing file yields defaults.
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.detection, CycleConfig::default());

        let mut config = Config::default();
        config.detection.min_length = 20.0;
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.detection.min_length, 20.0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_from_corrupt_file() {
        let dir = std::env::temp_dir().join("hypnocycle_test_config_corrupt");
        let path = dir.join("config.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
        // The unreadable file is left as it was.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
