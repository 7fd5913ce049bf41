//! Caching policy for the HTTP layer.

use respcache_core::cache::DEFAULT_TTL_MS;

/// Which requests are cached and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL stamped on every stored response, in milliseconds.
    pub ttl_ms: i64,

    /// HTTP methods eligible for caching, compared case-insensitively.
    pub methods: Vec<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { ttl_ms: DEFAULT_TTL_MS, methods: vec!["get".into()] }
    }
}

impl CacheOptions {
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn is_cacheable(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}
