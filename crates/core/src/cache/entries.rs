//! Row-level operations on the `api_cache` table.
//!
//! These are policy-free: values are opaque text and timestamps are
//! whatever the caller passes in. Freshness lives in the manager.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored cache row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    /// Serialized JSON payload, uninterpreted.
    pub value: String,
    /// Epoch milliseconds of the last write.
    pub created_at: i64,
}

impl CacheDb {
    /// Point lookup by key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn read_row(&self, key: &str) -> Result<Option<CacheRow>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheRow>, Error> {
                let mut stmt = conn.prepare_cached("SELECT value, created_at FROM api_cache WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(CacheRow {
                        value: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        created_at: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or fully replace a row.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist,
    /// overwrites value and timestamp if it does.
    pub async fn write_row(&self, key: &str, value: &str, created_at: i64) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.prepare_cached(
                    "INSERT INTO api_cache (key, value, created_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        created_at = excluded.created_at",
                )?
                .execute(params![key, value, created_at])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a row by key.
    ///
    /// Returns whether a row was removed; a missing key is not an error.
    pub async fn delete_row(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn
                    .prepare_cached("DELETE FROM api_cache WHERE key = ?1")?
                    .execute(params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every row, then VACUUM to reclaim space.
    ///
    /// VACUUM rewrites the whole file; keep this off hot paths.
    /// Returns the number of deleted rows.
    pub async fn delete_all(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM api_cache", [])?;
                conn.execute_batch("VACUUM")?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete rows whose value contains any of `patterns` and satisfies `predicate`.
    ///
    /// `patterns` are SQL `LIKE` substrings used as a cheap prefilter; the
    /// predicate sees the full stored text of each candidate and makes the
    /// final call. Runs in a single transaction.
    /// Returns the number of deleted rows.
    pub async fn purge_matching<F>(&self, patterns: &[&str], predicate: F) -> Result<u64, Error>
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        if patterns.is_empty() {
            return Ok(0);
        }

        let likes: Vec<String> = patterns.iter().map(|p| format!("%{p}%")).collect();
        let filter = vec!["value LIKE ?"; likes.len()].join(" OR ");
        let select = format!("SELECT key, value FROM api_cache WHERE {filter}");

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;

                let doomed: Vec<String> = {
                    let mut stmt = tx.prepare(&select)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(likes.iter()), |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                    })?;

                    let mut doomed = Vec::new();
                    for row in rows {
                        let (key, value) = row?;
                        if value.as_deref().is_some_and(&predicate) {
                            doomed.push(key);
                        }
                    }
                    doomed
                };

                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM api_cache WHERE key = ?1")?;
                    for key in &doomed {
                        deleted += stmt.execute(params![key])? as u64;
                    }
                }

                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows in the table.
    pub async fn count_rows(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM api_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
