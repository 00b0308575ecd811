//! Startup configuration for data sources and logging.
//!
//! # Responsibility
//! - Describe where the database lives and how connections are tuned.
//! - Load that description from JSON with defaults for every field.
//!
//! # Invariants
//! - A validated config always has a supported log level and a non-zero
//!   busy timeout.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Data source and logging settings supplied at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSourceConfig {
    /// Database file. `None` selects a private scratch database.
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute log directory. `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl DataSourceConfig {
    /// Config pointing at a database file, other fields defaulted.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Checks field values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(path) = self.database_path.as_ref() {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "database_path cannot be empty".to_string(),
                ));
            }
        }
        if let Some(dir) = self.log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Errors raised while loading startup configuration.
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
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
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

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Parses and validates a JSON config document.
pub fn parse_config(text: &str) -> Result<DataSourceConfig, ConfigError> {
    let config: DataSourceConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses, and validates a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DataSourceConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

#[cfg(test)]
mod tests {
    use super::{parse_config, ConfigError, DataSourceConfig};

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, DataSourceConfig::default());
        assert!(config.database_path.is_none());
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn zero_busy_timeout_is_rejected() {
        let err = parse_config(r#"{"busy_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = parse_config(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported log level"));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = parse_config(r#"{"pool_size": 4}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
