//! The store boundary the proxy and lifecycle manager are written against.
//!
//! Callers hold an `Arc<dyn CacheStore>` and name the generation explicitly
//! on every call; there is no ambient "current cache".

use super::connection::CacheDb;
use super::entries::{CachedResponse, EntryMeta};
use super::generations::Generation;
use super::hash::RequestKey;
use crate::Error;

/// Versioned key/value store of response snapshots.
///
/// Each call is an independent atomic operation; overlapping writes to the
/// same key resolve last-writer-wins.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create a generation if it does not exist.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Every generation currently stored.
    async fn generations(&self) -> Result<Vec<Generation>, Error>;

    /// Delete a generation and its entries. Returns false if it was absent.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// Record that a generation has been promoted to active.
    async fn mark_active(&self, generation: &str) -> Result<(), Error>;

    /// Look up the snapshot stored for a request.
    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error>;

    /// Store or overwrite a snapshot. Only 2xx snapshots are accepted, and
    /// only into a generation that still exists.
    async fn put(&self, generation: &str, entry: &CachedResponse) -> Result<(), Error>;

    /// List the entries of a generation.
    async fn entries(&self, generation: &str) -> Result<Vec<EntryMeta>, Error>;
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.create_generation(generation).await
    }

    async fn generations(&self) -> Result<Vec<Generation>, Error> {
        self.list_generations().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn mark_active(&self, generation: &str) -> Result<(), Error> {
        self.activate_generation(generation).await
    }

    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.get_entry(generation, key).await
    }

    async fn put(&self, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
        self.put_entry(generation, entry).await
    }

    async fn entries(&self, generation: &str) -> Result<Vec<EntryMeta>, Error> {
        self.list_entries(generation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_store_through_trait_object() {
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let key = RequestKey::new("GET", "http://localhost:8000/static/js/main.js");
        let entry = CachedResponse::capture(key.clone(), 200, Vec::new(), b"init()".to_vec());

        store.open("depot-shell-v1").await.unwrap();
        store.put("depot-shell-v1", &entry).await.unwrap();

        let found = store.lookup("depot-shell-v1", &key).await.unwrap();
        assert_eq!(found.map(|e| e.body), Some(b"init()".to_vec()));
        assert_eq!(store.entries("depot-shell-v1").await.unwrap().len(), 1);

        assert!(store.delete("depot-shell-v1").await.unwrap());
        assert!(store.generations().await.unwrap().is_empty());
        assert!(store.lookup("depot-shell-v1", &key).await.unwrap().is_none());
    }
}
