//! SQLite-backed versioned cache stores.
//!
//! This module persists cached responses in SQLite with async access via
//! tokio-rusqlite. One database file holds every store generation:
//!
//! - Named stores, exactly one of which is "current" after activation
//! - Content-addressed entry keys (SHA-256 over method + URL)
//! - Insertion-order tracking for oldest-first eviction
//! - Automatic schema migrations, WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
