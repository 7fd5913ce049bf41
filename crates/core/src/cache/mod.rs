//! SQLite-backed key-value cache for serialized HTTP responses.
//!
//! This module provides a persistent, TTL-aware cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Upsert-by-key storage of opaque JSON values
//! - Per-entry TTL overrides and lazy expiry on read
//! - Detection of abandoned in-flight (`loading`) placeholders
//! - Startup purge of residue left by a crashed run
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod manager;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheRow;
pub use manager::{CacheManager, DEFAULT_TTL_MS, LOADING_GRACE_MS, Lookup};
