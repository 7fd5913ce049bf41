//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and ensuring the schema exists.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;";

/// Durable store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Clones share the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the parent directory and the file if they don't exist,
    /// applies pragmas, and ensures the schema is in place.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening cache database");

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a private in-memory SQLite database with the same
    /// pragma configuration and schema as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        let db = Self { conn };
        db.ensure_ready().await?;
        Ok(db)
    }

    /// Create the entry table and its index if absent.
    ///
    /// Idempotent, and safe to race against another process initializing
    /// the same file.
    pub async fn ensure_ready(&self) -> Result<(), Error> {
        migrations::run(&self.conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cache.db");

        let _db = CacheDb::open(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_ensure_ready_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_ready().await.unwrap();
        db.ensure_ready().await.unwrap();
        assert_eq!(db.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_two_handles_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        let first = CacheDb::open(&path).await.unwrap();
        let second = CacheDb::open(&path).await.unwrap();

        first.write_row("k", "{\"a\":1}", 10).await.unwrap();
        let row = second.read_row("k").await.unwrap().unwrap();
        assert_eq!(row.value, "{\"a\":1}");
        assert_eq!(row.created_at, 10);
    }
}
