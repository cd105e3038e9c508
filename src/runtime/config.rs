//! Runtime configuration for fan-out tasks
//!
//! Controls how the threads spawned by `all` and `join*` are built. The
//! configuration is read from TOML and installed once per process.

use crate::error::ConfigError;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Smallest stack accepted for a fan-out thread
pub const MIN_STACK_SIZE: usize = 16 * 1024;

const DEFAULT_THREAD_NAME_PREFIX: &str = "flux-future";

static INSTALLED: OnceCell<RuntimeConfig> = OnceCell::new();

/// Settings applied to every fan-out thread
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Prefix of fan-out thread names; the task index is appended
    pub thread_name_prefix: String,
    /// Stack size in bytes, or the platform default when unset
    pub stack_size: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }

        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::Invalid(
                "thread_name_prefix must not contain NUL bytes".to_string(),
            ));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "stack_size {} is below the minimum of {} bytes",
                    size, MIN_STACK_SIZE
                )));
            }
        }

        Ok(())
    }

    /// Name given to the fan-out thread running task `index`
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}-{}", self.thread_name_prefix, index)
    }
}

/// Install the process-wide configuration.
///
/// Only the first call succeeds, and only before any fan-out has read the
/// default configuration.
pub fn install(config: RuntimeConfig) -> Result<(), ConfigError> {
    config.validate()?;
    INSTALLED.set(config).map_err(|_| ConfigError::AlreadySet)?;
    tracing::debug!("runtime configuration installed");
    Ok(())
}

/// The installed configuration, falling back to the defaults
pub fn current() -> &'static RuntimeConfig {
    INSTALLED.get_or_init(RuntimeConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thread_name(3), "flux-future-3");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml("stack_size = 65536\n").unwrap();
        assert_eq!(config.stack_size, Some(65536));
        assert_eq!(config.thread_name_prefix, "flux-future");
    }

    #[test]
    fn test_small_stack_rejected() {
        let err = RuntimeConfig::from_toml("stack_size = 1024\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
