//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, CachedResponse, EntryMeta, Generation, RequestKey};
pub use config::{AppConfig, ConfigError, PrecachePolicy};
pub use error::Error;
