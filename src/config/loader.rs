use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/skybridge/config.toml` on Unix/macOS, or equivalent
    /// on other platforms via `dirs::config_dir()`. Falls back to the
    /// current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("skybridge").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    /// - Returns an error if reading, parsing, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from an explicit path (CLI override).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Broker host and port are usable
    /// - Topic names are non-empty
    /// - The weather sampler, when enabled, has an API key and a sane interval
    /// - Fixed coordinates, when present, are within valid ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.host.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Broker host must not be empty".to_string(),
            });
        }
        if self.broker.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Broker port must be non-zero".to_string(),
            });
        }
        if self.broker.keep_alive_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Broker keep-alive must be at least 1 second".to_string(),
            });
        }

        if self.topics.weather.is_empty() || self.topics.notification.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Topic names must not be empty".to_string(),
            });
        }

        if self.weather.enabled && self.weather.interval_ms < 1_000 {
            return Err(ConfigError::ValidationError {
                message: "Weather interval must be at least 1000 ms".to_string(),
            });
        }

        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::ValidationError {
                    message: format!("Latitude {} out of range [-90, 90]", lat),
                });
            }
        }
        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::ValidationError {
                    message: format!("Longitude {} out of range [-180, 180]", lon),
                });
            }
        }

        Ok(())
    }
}
