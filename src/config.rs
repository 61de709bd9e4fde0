//! Configuration management for HLS Fetcher
//!
//! This module provides unified configuration management with multi-source
//! loading and zero-config defaults. Every working location and behavior
//! knob is explicit here; nothing is discovered from the ambient
//! filesystem at run time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::client::ClientConfig;
use crate::app::mux::MuxerConfig;
use crate::app::retry::RetryPolicy;
use crate::app::sequencer::{SequencerConfig, StorageConfig};
use crate::constants::{budget, logging};
use crate::errors::{ConfigError, Result};

/// Download concurrency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum concurrently active segment downloads per job
    pub max_concurrent_downloads: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: budget::MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// Segment retry policy
    pub retry: RetryPolicy,
    /// Concurrency settings
    pub download: DownloadConfig,
    /// Working directory layout
    pub storage: StorageConfig,
    /// Job sequencing behavior
    pub sequencer: SequencerConfig,
    /// External muxer settings
    pub mux: MuxerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        debug!("Configuration loaded from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Load from the given file, or fall back to defaults when none is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::load(path)?),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.max_concurrent_downloads".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.download.max_concurrent_downloads > budget::MAX_BUDGET {
            return Err(ConfigError::InvalidValue {
                field: "download.max_concurrent_downloads".to_string(),
                value: self.download.max_concurrent_downloads.to_string(),
                reason: format!("must not exceed {}", budget::MAX_BUDGET),
            });
        }

        if let Err(e) = self.retry.validate() {
            return Err(ConfigError::InvalidValue {
                field: "retry".to_string(),
                value: format!("{:?}", self.retry),
                reason: e.to_string(),
            });
        }

        if self.sequencer.artifact_extension.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sequencer.artifact_extension".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.mux.program.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mux.program".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration presets for different deployment scenarios
pub struct ConfigPresets;

impl ConfigPresets {
    /// Production configuration: the legacy defaults
    pub fn production() -> AppConfig {
        AppConfig::default()
    }

    /// Testing configuration with fast timeouts and bounded retries
    pub fn testing() -> AppConfig {
        use std::time::Duration;

        AppConfig {
            client: ClientConfig {
                request_timeout: Duration::from_secs(5),
                connect_timeout: Duration::from_secs(2),
                ..Default::default()
            },
            retry: RetryPolicy::limited(2, Duration::from_millis(50)),
            download: DownloadConfig {
                max_concurrent_downloads: 2,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Test defaults line up with the documented contract
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.download.max_concurrent_downloads, 6);
        assert_eq!(config.retry.max_attempts, None);
        assert_eq!(config.sequencer.artifact_extension, "mp4");
        assert!(config.validate().is_ok());
    }

    /// Test validation rejects out-of-range values
    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.download.max_concurrent_downloads = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sequencer.artifact_extension = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry.jitter_factor = 2.0;
        assert!(config.validate().is_err());
    }

    /// Test round-trip through TOML
    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.download.max_concurrent_downloads,
            config.download.max_concurrent_downloads
        );
        assert_eq!(deserialized.retry.backoff, config.retry.backoff);
    }

    /// Test loading from a file, including the missing-file error
    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[download]\nmax_concurrent_downloads = 3").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.download.max_concurrent_downloads, 3);

        let missing = AppConfig::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(missing, Err(ConfigError::NotFound { .. })));
    }

    /// Test presets are valid and distinct
    #[test]
    fn test_presets() {
        let production = ConfigPresets::production();
        let testing = ConfigPresets::testing();

        assert!(production.validate().is_ok());
        assert!(testing.validate().is_ok());
        assert!(testing.retry.max_attempts.is_some());
        assert!(production.retry.max_attempts.is_none());
        assert!(
            testing.download.max_concurrent_downloads
                <= production.download.max_concurrent_downloads
        );
    }
}
