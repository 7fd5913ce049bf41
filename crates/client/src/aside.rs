//! Cache-aside wrapper around an arbitrary request future.
//!
//! The flow per cacheable request:
//!
//! 1. `find` the key; a fresh `cached` entry is returned without calling out.
//! 2. Otherwise write a `loading` placeholder over whatever was there.
//! 3. Run the fetcher. On success store a `cached` entry; on error remove
//!    the placeholder so the next caller starts clean.
//!
//! A caller that finds someone else's live `loading` placeholder fetches on
//! its own; concurrent fetches for one key race and the last write wins. If
//! the process dies between steps 2 and 3 the placeholder is left behind and
//! the core cache drops it after its grace window or on the next startup.

use std::future::Future;
use std::sync::Arc;

use respcache_core::{SystemTimeProvider, TimeProvider};
use serde_json::Value;

use crate::key::generate_key;
use crate::options::CacheOptions;
use crate::storage::{CachedResponse, Storage, StorageValue};

/// Serves requests from [`Storage`] when possible, fetching otherwise.
#[derive(Debug)]
pub struct CacheAside<S> {
    storage: S,
    options: CacheOptions,
    clock: Arc<dyn TimeProvider>,
}

impl<S: Storage> CacheAside<S> {
    pub fn new(storage: S, options: CacheOptions) -> Self {
        Self::with_time_provider(storage, options, Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(storage: S, options: CacheOptions, clock: Arc<dyn TimeProvider>) -> Self {
        Self { storage, options, clock }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Return the cached response for this request, or run `fetcher` and cache its result.
    ///
    /// Errors from `fetcher` are returned unchanged and never cached.
    pub async fn fetch<F, Fut, E>(
        &self, method: &str, url: &str, params: Option<&Value>, fetcher: F,
    ) -> Result<CachedResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedResponse, E>>,
    {
        if !self.options.is_cacheable(method) {
            return fetcher().await;
        }

        let key = generate_key(method, url, params);
        let previous = self.storage.find(&key).await;

        let now = self.clock.now_millis();
        if let Some(response) = previous
            .as_ref()
            .filter(|stored| stored.is_fresh(now))
            .and_then(StorageValue::response)
        {
            tracing::debug!(key = %key, "cache hit");
            return Ok(response.clone());
        }

        tracing::debug!(key = %key, state = ?previous.as_ref().map(state_name), "cache miss");
        self.storage
            .set(&key, &StorageValue::loading_over(previous.as_ref()))
            .await;

        match fetcher().await {
            Ok(response) => {
                let entry = StorageValue::cached(response.clone(), self.options.ttl_ms, self.clock.now_millis());
                self.storage.set(&key, &entry).await;
                Ok(response)
            }
            Err(error) => {
                self.storage.remove(&key).await;
                Err(error)
            }
        }
    }
}

fn state_name(value: &StorageValue) -> &'static str {
    match value {
        StorageValue::Cached(_) => "cached",
        StorageValue::Stale(_) => "stale",
        StorageValue::MustRevalidate(_) => "must-revalidate",
        StorageValue::Loading(_) => "loading",
        StorageValue::Empty => "empty",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use respcache_core::cache::DEFAULT_TTL_MS;
    use respcache_core::{CacheDb, CacheManager, ManualTimeProvider};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn aside_at(now: i64, options: CacheOptions) -> (CacheAside<SqliteStorage>, Arc<ManualTimeProvider>) {
        let clock = Arc::new(ManualTimeProvider::new(now));
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = CacheManager::with_time_provider(db, clock.clone());
        (CacheAside::with_time_provider(SqliteStorage::new(cache), options, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let (aside, _) = aside_at(0, CacheOptions::default()).await;
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(CachedResponse::ok(json!({"n": 1})))
        };

        let first = aside.fetch("get", "/a", None, fetch).await.unwrap();
        let second = aside.fetch("get", "/a", None, fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetches_after_ttl() {
        let (aside, clock) = aside_at(0, CacheOptions::default().with_ttl_ms(1_000)).await;
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(CachedResponse::ok(json!(n)))
        };

        assert_eq!(aside.fetch("get", "/a", None, fetch).await.unwrap().data, Some(json!(0)));
        clock.set(999);
        assert_eq!(aside.fetch("get", "/a", None, fetch).await.unwrap().data, Some(json!(0)));
        clock.set(1_001);
        assert_eq!(aside.fetch("get", "/a", None, fetch).await.unwrap().data, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_unbounded_ttl_is_served_from_cache() {
        let (aside, clock) = aside_at(1_700_000_000_000, CacheOptions::default().with_ttl_ms(i64::MAX)).await;
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(CachedResponse::ok(json!(n)))
        };

        assert_eq!(aside.fetch("get", "/forever", None, fetch).await.unwrap().data, Some(json!(0)));
        clock.advance(DEFAULT_TTL_MS * 10);
        assert_eq!(aside.fetch("get", "/forever", None, fetch).await.unwrap().data, Some(json!(0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetches_at_exact_ttl() {
        let (aside, clock) = aside_at(0, CacheOptions::default().with_ttl_ms(1_000)).await;
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(CachedResponse::ok(json!(n)))
        };

        aside.fetch("get", "/edge", None, fetch).await.unwrap();
        clock.set(1_000);
        assert_eq!(aside.fetch("get", "/edge", None, fetch).await.unwrap().data, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_error_removes_placeholder() {
        let (aside, _) = aside_at(0, CacheOptions::default()).await;
        let result = aside
            .fetch("get", "/fail", None, || async { Err::<CachedResponse, _>("upstream down") })
            .await;

        assert_eq!(result, Err("upstream down"));
        assert!(aside.storage().find("get:/fail:{}").await.is_none());
        assert_eq!(aside.storage().cache().db().count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_is_visible_while_in_flight() {
        let (aside, _) = aside_at(0, CacheOptions::default()).await;
        let storage = aside.storage().clone();
        let probe = &storage;

        aside
            .fetch("get", "/slow", None, move || async move {
                let seen = probe.find("get:/slow:{}").await;
                assert_eq!(seen, Some(StorageValue::loading_over(None)));
                Ok::<_, String>(CachedResponse::ok(json!("done")))
            })
            .await
            .unwrap();

        assert!(matches!(storage.find("get:/slow:{}").await, Some(StorageValue::Cached(_))));
    }

    #[tokio::test]
    async fn test_non_cacheable_method_bypasses_storage() {
        let (aside, _) = aside_at(0, CacheOptions::default()).await;
        aside
            .fetch("post", "/submit", None, || async { Ok::<_, String>(CachedResponse::ok(json!(1))) })
            .await
            .unwrap();

        assert_eq!(aside.storage().cache().db().count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_params_are_part_of_the_key() {
        let (aside, _) = aside_at(0, CacheOptions::default()).await;
        let one = json!({"id": 1});
        let two = json!({"id": 2});

        aside
            .fetch("get", "/item", Some(&one), || async { Ok::<_, String>(CachedResponse::ok(json!("one"))) })
            .await
            .unwrap();
        let second = aside
            .fetch("get", "/item", Some(&two), || async { Ok::<_, String>(CachedResponse::ok(json!("two"))) })
            .await
            .unwrap();

        assert_eq!(second.data, Some(json!("two")));
        assert_eq!(aside.storage().cache().db().count_rows().await.unwrap(), 2);
    }
}
