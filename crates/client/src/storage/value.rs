//! Stored shape of an HTTP cache entry.
//!
//! Serialized with a `state` tag and camelCase fields, e.g.
//! `{"state":"cached","data":{...},"ttl":604800000,"createdAt":...}`.
//! The top-level `ttl`, `state` and `previous` fields are what the core
//! cache manager reads for expiry and residue detection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A response as kept in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
}

impl CachedResponse {
    /// A 200 response carrying `data` and no headers.
    pub fn ok(data: Value) -> Self {
        Self { data: Some(data), headers: BTreeMap::new(), status: 200, status_text: "OK".into() }
    }
}

/// A complete entry (`cached` or `must-revalidate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry {
    pub data: CachedResponse,
    pub ttl: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_ttl: Option<i64>,
    pub created_at: i64,
}

/// An entry past its TTL that may still be served while revalidating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleEntry {
    pub data: CachedResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_ttl: Option<i64>,
    pub created_at: i64,
}

/// What a `loading` placeholder replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Previous {
    Empty,
    Stale,
    MustRevalidate,
}

/// In-flight placeholder written before a request is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingEntry {
    pub previous: Previous,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CachedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Value stored per request key by the HTTP caching layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum StorageValue {
    Cached(CachedEntry),
    Stale(StaleEntry),
    MustRevalidate(CachedEntry),
    Loading(LoadingEntry),
    Empty,
}

impl StorageValue {
    /// A fresh `cached` entry.
    pub fn cached(data: CachedResponse, ttl: i64, created_at: i64) -> Self {
        StorageValue::Cached(CachedEntry { data, ttl, stale_ttl: None, created_at })
    }

    /// Placeholder to write while a request for this key is in flight.
    ///
    /// Keeps the old response when there is one, so a crash mid-request
    /// leaves a `previous: stale` marker rather than losing the data.
    pub fn loading_over(previous: Option<&StorageValue>) -> Self {
        let carried = match previous {
            Some(StorageValue::Cached(entry)) => {
                Some((Previous::Stale, entry.data.clone(), Some(entry.ttl), entry.stale_ttl, entry.created_at))
            }
            Some(StorageValue::MustRevalidate(entry)) => {
                Some((Previous::MustRevalidate, entry.data.clone(), Some(entry.ttl), entry.stale_ttl, entry.created_at))
            }
            Some(StorageValue::Stale(entry)) => {
                Some((Previous::Stale, entry.data.clone(), entry.ttl, entry.stale_ttl, entry.created_at))
            }
            _ => None,
        };

        match carried {
            Some((previous, data, ttl, stale_ttl, created_at)) => StorageValue::Loading(LoadingEntry {
                previous,
                data: Some(data),
                ttl,
                stale_ttl,
                created_at: Some(created_at),
            }),
            None => StorageValue::Loading(LoadingEntry {
                previous: Previous::Empty,
                data: None,
                ttl: None,
                stale_ttl: None,
                created_at: None,
            }),
        }
    }

    /// Whether this is a `cached` entry still inside its TTL at `now` (ms).
    ///
    /// Exclusive at `created_at + ttl`, one millisecond earlier than the core
    /// cache's inclusive expiry, so the entry is refetched at that instant.
    pub fn is_fresh(&self, now: i64) -> bool {
        match self {
            StorageValue::Cached(entry) => entry.created_at.saturating_add(entry.ttl) > now,
            _ => false,
        }
    }

    /// The stored response, if any.
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            StorageValue::Cached(entry) | StorageValue::MustRevalidate(entry) => Some(&entry.data),
            StorageValue::Stale(entry) => Some(&entry.data),
            StorageValue::Loading(entry) => entry.data.as_ref(),
            StorageValue::Empty => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, StorageValue::Loading(_))
    }
}
