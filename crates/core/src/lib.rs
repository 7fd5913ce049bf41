//! Core of respcache.
//!
//! This crate provides:
//! - Durable SQLite store for cache entries
//! - Cache manager enforcing TTL and in-flight expiry
//! - Unified error types
//! - Configuration of the cache location

pub mod cache;
pub mod config;
pub mod error;
pub mod time;

pub use cache::{CacheDb, CacheManager, CacheRow, Lookup};
pub use config::CacheConfig;
pub use error::Error;
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider};
