//! Registry configuration.
//!
//! # Responsibility
//! - Deserialize registry settings from JSON with per-field defaults.
//! - Reject settings that would make the registry misbehave at runtime.
//!
//! # Invariants
//! - A config returned by `from_json_str` / `from_file` has passed `validate()`.
//! - Absent `database_path` selects a private in-memory store.

use crate::logging::default_log_level;
use crate::model::names::validate_name;
use crate::repo::repository_store::{RetryPolicy, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "default";
const MAX_SET_TAG_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// SQLite database file. `None` keeps everything in memory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Namespace used when a request does not name one.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    /// Total version-conditioned write attempts per tag update.
    #[serde(default = "default_set_tag_max_attempts")]
    pub set_tag_max_attempts: u32,
    /// Base backoff between tag update attempts, in milliseconds.
    #[serde(default = "default_set_tag_backoff_ms")]
    pub set_tag_backoff_ms: u64,
    /// Deadline applied to requests that carry none.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. `None` disables file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

const fn default_set_tag_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_set_tag_backoff_ms() -> u64 {
    DEFAULT_BACKOFF.as_millis() as u64
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            default_namespace: default_namespace(),
            set_tag_max_attempts: default_set_tag_max_attempts(),
            set_tag_backoff_ms: default_set_tag_backoff_ms(),
            request_timeout_ms: None,
            log_level: None,
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name("default_namespace", &self.default_namespace)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        if self.set_tag_max_attempts == 0 || self.set_tag_max_attempts > MAX_SET_TAG_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "set_tag_max_attempts must be between 1 and {MAX_SET_TAG_ATTEMPTS}, got {}",
                self.set_tag_max_attempts
            )));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.set_tag_max_attempts,
            Duration::from_millis(self.set_tag_backoff_ms),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Configured log level, falling back to the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistryConfig, DEFAULT_NAMESPACE};
    use crate::logging::default_log_level;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RegistryConfig::from_json_str("{}").expect("defaults should be valid");
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.default_namespace, DEFAULT_NAMESPACE);
        assert!(config.database_path.is_none());
        assert_eq!(config.retry_policy().max_attempts, 5);
    }

    #[test]
    fn overrides_are_applied() {
        let config = RegistryConfig::from_json_str(
            r#"{
                "database_path": "/var/lib/imagereg/registry.db",
                "default_namespace": "ci",
                "set_tag_max_attempts": 8,
                "set_tag_backoff_ms": 25,
                "request_timeout_ms": 1500,
                "log_level": "warn"
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.default_namespace, "ci");
        assert_eq!(config.retry_policy().backoff, Duration::from_millis(25));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.effective_log_level(), "warn");
    }

    #[test]
    fn log_level_falls_back_to_build_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.effective_log_level(), default_log_level());

        let config = RegistryConfig {
            log_level: Some("error".to_string()),
            ..RegistryConfig::default()
        };
        assert_eq!(config.effective_log_level(), "error");
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        let err = RegistryConfig::from_json_str(r#"{"retries": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = RegistryConfig::from_json_str(r#"{"set_tag_max_attempts": 0}"#).unwrap_err();
        assert!(err.to_string().contains("set_tag_max_attempts"));

        let err = RegistryConfig::from_json_str(r#"{"log_dir": "logs"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RegistryConfig::from_json_str(r#"{"default_namespace": ""}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = RegistryConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
