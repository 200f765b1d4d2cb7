//! Container configuration model.
//!
//! # Responsibility
//! - Describe how a container is bootstrapped and where it logs.
//! - Validate user-provided values before any extension runs.
//!
//! # Invariants
//! - Every field has a default, so partial documents deserialize.
//! - Container names match [`CONTAINER_NAME_RE`].

use crate::logging::{default_log_level, normalize_level, normalize_log_dir, LoggingError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Container names: lowercase, starting with a letter, at most 64 chars.
pub static CONTAINER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").expect("container name regex must compile")
});

const DEFAULT_CONTAINER_NAME: &str = "application";

/// Log sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; `None` keeps file logging off.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: String,
    /// Create every non-lazy singleton during refresh.
    pub pre_instantiate_singletons: bool,
    /// Append the listener detector to the pipeline tail.
    pub detect_listeners: bool,
    pub logging: LoggingConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONTAINER_NAME.to_string(),
            pre_instantiate_singletons: true,
            detect_listeners: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl ContainerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks the container name and logging settings.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidName`] when the name does not match
    ///   [`CONTAINER_NAME_RE`].
    /// - [`ConfigError::Logging`] when the level or directory is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CONTAINER_NAME_RE.is_match(&self.name) {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        normalize_level(&self.logging.level)?;
        if let Some(dir) = &self.logging.dir {
            normalize_log_dir(dir)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidName(String),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(
                f,
                "container name {value:?} must be lowercase, start with a letter and be at most 64 characters"
            ),
            Self::Logging(err) => write!(f, "invalid logging config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(_) => None,
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}
