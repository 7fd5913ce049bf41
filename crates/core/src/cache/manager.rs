//! Freshness policy over the durable store.
//!
//! [`CacheManager`] offers two layers:
//!
//! - `lookup`, `try_set`, `try_delete`, `try_clear`, `purge_residue` return
//!   `Result` so every failure path is visible and testable.
//! - `get`, `get_value`, `set`, `delete`, `clear` never fail: errors are
//!   logged and degrade to a miss or a no-op. The cache is an optimization,
//!   never a source of truth.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::connection::CacheDb;
use crate::Error;
use crate::config::CacheConfig;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Default time-to-live for entries without a `ttl` override (7 days).
pub const DEFAULT_TTL_MS: i64 = 1000 * 60 * 60 * 24 * 7;

/// Age after which a `state: "loading"` entry is considered abandoned.
pub const LOADING_GRACE_MS: i64 = 10_000;

const STATE_LOADING: &str = "loading";
const PREVIOUS_EMPTY: &str = "empty";

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Fresh entry.
    Hit(Value),
    /// No row for the key.
    Miss,
    /// Row outlived its effective TTL and was deleted.
    Expired,
    /// Row was an in-flight placeholder past the grace window and was deleted.
    Zombie,
    /// Stored text is not valid JSON. The row is left in place.
    Corrupt,
}

impl Lookup {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Effective TTL of a stored value: its numeric `ttl` field, else the default.
pub fn effective_ttl(value: &Value) -> f64 {
    value
        .get("ttl")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_TTL_MS as f64)
}

/// Whether a stored value is an in-flight placeholder.
pub fn is_loading(value: &Value) -> bool {
    value.get("state").and_then(Value::as_str) == Some(STATE_LOADING)
}

/// Whether a stored value is residue from a crashed or interrupted run.
pub fn is_residue(value: &Value) -> bool {
    is_loading(value) || value.get("previous").and_then(Value::as_str) == Some(PREVIOUS_EMPTY)
}

/// Cache manager handle.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone, Debug)]
pub struct CacheManager {
    db: CacheDb,
    clock: Arc<dyn TimeProvider>,
}

impl CacheManager {
    /// Wrap an open store using the system clock.
    ///
    /// Does not run the startup residue purge.
    pub fn new(db: CacheDb) -> Self {
        Self::with_time_provider(db, Arc::new(SystemTimeProvider))
    }

    /// Wrap an open store with a custom time source.
    pub fn with_time_provider(db: CacheDb, clock: Arc<dyn TimeProvider>) -> Self {
        Self { db, clock }
    }

    /// Open the cache at the configured location.
    ///
    /// Failing to open the store is fatal and returned to the caller.
    /// The startup residue purge that follows is best-effort.
    pub async fn open(config: &CacheConfig) -> Result<Self, Error> {
        config.validate()?;
        let db = CacheDb::open(config.db_path()).await?;
        let manager = Self::new(db);
        manager.startup_purge().await;
        Ok(manager)
    }

    /// Open a private in-memory cache.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let manager = Self::new(CacheDb::open_in_memory().await?);
        manager.startup_purge().await;
        Ok(manager)
    }

    /// The underlying durable store.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    async fn startup_purge(&self) {
        match self.purge_residue().await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "purged residue entries from previous run"),
            Err(error) => tracing::warn!(%error, "startup residue purge failed"),
        }
    }

    /// Remove in-flight placeholders and incomplete snapshots left by a prior run.
    ///
    /// Candidates are prefiltered by substring, then each stored value is
    /// parsed and its top-level `state`/`previous` fields checked.
    pub async fn purge_residue(&self) -> Result<u64, Error> {
        self.db
            .purge_matching(&[STATE_LOADING, PREVIOUS_EMPTY], |raw| {
                serde_json::from_str::<Value>(raw).is_ok_and(|value| is_residue(&value))
            })
            .await
    }

    /// Look a key up and apply freshness rules.
    ///
    /// Expired and zombie rows are deleted as a side effect.
    pub async fn lookup(&self, key: &str) -> Result<Lookup, Error> {
        let Some(row) = self.db.read_row(key).await? else {
            return Ok(Lookup::Miss);
        };

        let value: Value = match serde_json::from_str(&row.value) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "cached value is not valid JSON");
                return Ok(Lookup::Corrupt);
            }
        };

        let age = self.clock.now_millis().saturating_sub(row.created_at);

        if age as f64 > effective_ttl(&value) {
            self.db.delete_row(key).await?;
            tracing::debug!(key, age, "cache entry expired");
            return Ok(Lookup::Expired);
        }

        if is_loading(&value) && age > LOADING_GRACE_MS {
            self.db.delete_row(key).await?;
            tracing::debug!(key, age, "abandoned loading entry removed");
            return Ok(Lookup::Zombie);
        }

        Ok(Lookup::Hit(value))
    }

    /// Serialize `value` and store it with the current timestamp.
    pub async fn try_set<T>(&self, key: &str, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value)?;
        self.db.write_row(key, &json, self.clock.now_millis()).await
    }

    /// Remove a key. Returns whether a row existed.
    pub async fn try_delete(&self, key: &str) -> Result<bool, Error> {
        self.db.delete_row(key).await
    }

    /// Remove every entry and reclaim space. Returns the number removed.
    pub async fn try_clear(&self) -> Result<u64, Error> {
        self.db.delete_all().await
    }

    /// Fresh value for `key` as raw JSON, or None.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        match self.lookup(key).await {
            Ok(lookup) => lookup.into_value(),
            Err(error) => {
                tracing::warn!(key, %error, "cache read failed");
                None
            }
        }
    }

    /// Fresh value for `key` decoded into `T`, or None.
    ///
    /// A value that does not fit `T` is logged and treated as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                tracing::warn!(key, %error, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Store `value` under `key`; failures are logged and dropped.
    pub async fn set<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        if let Err(error) = self.try_set(key, value).await {
            tracing::warn!(key, %error, "cache write failed");
        }
    }

    /// Remove `key`; failures are logged and dropped.
    pub async fn delete(&self, key: &str) {
        if let Err(error) = self.try_delete(key).await {
            tracing::warn!(key, %error, "cache delete failed");
        }
    }

    /// Remove every entry; failures are logged and dropped.
    pub async fn clear(&self) {
        match self.try_clear().await {
            Ok(deleted) => tracing::info!(deleted, "cache cleared"),
            Err(error) => tracing::warn!(%error, "cache clear failed"),
        }
    }
}
