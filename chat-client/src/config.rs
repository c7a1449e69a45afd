//! Configuration loading for chat-client.
//!
//! Configuration is loaded from a TOML file. Every section and key is
//! optional; missing values fall back to the defaults below.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for the chat engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Backend connection configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Poll loop configuration.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat backend (default: http://127.0.0.1:8080).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds (default: 10000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Route answering device information (default: `/`).
    #[serde(default = "default_device_info_path")]
    pub device_info_path: String,
    /// Route answering the full message list (default: `/messages`).
    #[serde(default = "default_messages_path")]
    pub messages_path: String,
    /// Route answering the latest message (default: `/messages/latest`).
    #[serde(default = "default_latest_path")]
    pub latest_path: String,
    /// Route accepting new messages (default: `/message`).
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
}

/// Poll loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Milliseconds between background fetches (default: 2000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Capacity of the engine event channel (default: 64).
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_device_info_path() -> String {
    "/".to_string()
}

fn default_messages_path() -> String {
    "/messages".to_string()
}

fn default_latest_path() -> String {
    "/messages/latest".to_string()
}

fn default_submit_path() -> String {
    "/message".to_string()
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_event_capacity() -> usize {
    64
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            device_info_path: default_device_info_path(),
            messages_path: default_messages_path(),
            latest_path: default_latest_path(),
            submit_path: default_submit_path(),
        }
    }
}

impl BackendConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PollConfig {
    /// Interval between background fetches.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_ms must be greater than zero".into(),
            ));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "backend.timeout_ms must be greater than zero".into(),
            ));
        }
        let url = reqwest::Url::parse(&self.backend.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "backend.base_url {:?} is not a valid URL: {}",
                self.backend.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[backend]
base_url = "http://192.168.1.172:8080"
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.base_url, "http://192.168.1.172:8080");
        assert_eq!(config.backend.messages_path, "/messages");
        assert_eq!(config.poll.interval_ms, 2000);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[backend]
base_url = "https://chat.lan"
timeout_ms = 2500
device_info_path = "/api/"
messages_path = "/api/messages"
latest_path = "/api/messages/latest"
submit_path = "/api/message"

[poll]
interval_ms = 500
event_capacity = 8
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.timeout(), Duration::from_millis(2500));
        assert_eq!(config.backend.submit_path, "/api/message");
        assert_eq!(config.poll.interval(), Duration::from_millis(500));
        assert_eq!(config.poll.event_capacity, 8);
        config.validate().unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.backend.device_info_path, "/");
        assert_eq!(config.backend.latest_path, "/messages/latest");
        assert_eq!(config.poll.interval(), Duration::from_secs(2));
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = EngineConfig::default();
        config.poll.interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = EngineConfig::default();
        config.backend.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.backend.base_url = "ftp://host".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll]\ninterval_ms = 750").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.poll.interval_ms, 750);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll\ninterval_ms = ").unwrap();

        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_from_file_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poll]\ninterval_ms = 0").unwrap();

        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
