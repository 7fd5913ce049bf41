//! Configuration validation rules.

use crate::config::CacheConfig;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_dir` is empty
    /// - `db_file` is empty or contains a path separator
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_dir".into(), reason: "must not be empty".into() });
        }

        if self.db_file.is_empty() {
            return Err(ConfigError::Invalid { field: "db_file".into(), reason: "must not be empty".into() });
        }
        if self.db_file.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "db_file".into(),
                reason: "must be a bare file name, not a path".into(),
            });
        }

        if self.cache_dir.is_relative() {
            tracing::debug!(cache_dir = %self.cache_dir.display(), "cache_dir is relative to the working directory");
        }

        Ok(())
    }
}
