//! Unified error types for respcache.
//!
//! The durable store surfaces every failure through [`Error`]. The cache
//! manager's never-fails operations log these and degrade to a miss or no-op.

use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Unified error type for the cache core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Cache directory or file could not be prepared.
    #[error("CACHE_IO: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded to or decoded from JSON.
    #[error("CACHE_SERDE: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("CACHE_CONFIG: {0}")]
    Config(#[from] ConfigError),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
