//! HTTP-cache plumbing for respcache.
//!
//! This crate adapts the core cache manager to the shape an HTTP response
//! cache expects: tagged storage values, `find`/`set`/`remove` storage hooks,
//! request key generation and a cache-aside helper.

pub mod aside;
pub mod key;
pub mod options;
pub mod storage;

pub use aside::CacheAside;
pub use key::generate_key;
pub use options::CacheOptions;
pub use storage::{CachedResponse, Previous, SqliteStorage, Storage, StorageValue};
