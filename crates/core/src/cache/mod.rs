//! SQLite-backed versioned cache of response snapshots.
//!
//! This module provides the store behind the caching proxy, using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Generations: version-scoped namespaces, deleted as a unit
//! - Entries keyed by a SHA-256 of request method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, EntryMeta};
pub use generations::Generation;
pub use hash::{RequestKey, compute_request_key};
pub use store::CacheStore;
