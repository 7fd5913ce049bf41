//! Storage hooks consumed by the HTTP caching layer.
//!
//! [`Storage`] is the three-call contract (`find`, `set`, `remove`) the
//! caching layer drives. [`SqliteStorage`] passes each call straight through
//! to the core [`CacheManager`], which owns expiry and never fails.

pub mod value;

use async_trait::async_trait;
use respcache_core::CacheManager;

pub use value::{CachedEntry, CachedResponse, LoadingEntry, Previous, StaleEntry, StorageValue};

/// Backing store for HTTP cache entries.
///
/// Implementations must not fail: a broken store behaves like an empty one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stored value for `key`, if present and not expired.
    async fn find(&self, key: &str) -> Option<StorageValue>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &StorageValue);

    /// Remove `key` if present.
    async fn remove(&self, key: &str);
}

/// [`Storage`] backed by the SQLite cache manager.
#[derive(Clone, Debug)]
pub struct SqliteStorage {
    cache: CacheManager,
}

impl SqliteStorage {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn find(&self, key: &str) -> Option<StorageValue> {
        self.cache.get::<StorageValue>(key).await
    }

    async fn set(&self, key: &str, value: &StorageValue) {
        self.cache.set(key, value).await;
    }

    async fn remove(&self, key: &str) {
        self.cache.delete(key).await;
    }
}
