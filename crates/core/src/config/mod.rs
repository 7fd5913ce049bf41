//! Cache location configuration with layered loading.
//!
//! Uses figment to merge, lowest to highest precedence:
//!
//! 1. Built-in defaults (`./data/cache.db`)
//! 2. TOML config file (if RESPCACHE_CONFIG_FILE set)
//! 3. Environment variables (RESPCACHE_*)
//! 4. The bare `CACHE_DIR` environment variable

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Environment variable naming the cache directory.
pub const CACHE_DIR_ENV: &str = "CACHE_DIR";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "RESPCACHE_CONFIG_FILE";

/// Where the cache database lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the database file. Created if absent.
    ///
    /// Set via CACHE_DIR or RESPCACHE_CACHE_DIR.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// File name of the database inside `cache_dir`.
    ///
    /// Set via RESPCACHE_DB_FILE.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_db_file() -> String {
    "cache.db".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { cache_dir: default_cache_dir(), db_file: default_db_file() }
    }
}

impl CacheConfig {
    /// Configuration rooted at an explicit directory.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self { cache_dir: cache_dir.into(), ..Default::default() }
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.cache_dir.join(&self.db_file)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(Env::prefixed("RESPCACHE_").ignore(&["config_file"]))
            .merge(Env::raw().only(&[CACHE_DIR_ENV]));

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
