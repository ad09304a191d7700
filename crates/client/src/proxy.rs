//! The caching proxy: one `handle` call per intercepted request.
//!
//! ### Strategies
//! - Non-cacheable requests are forwarded untouched and never touch the store.
//! - Static and third-party assets are served **Cache-First**: a hit in the
//!   active generation is returned without a network round-trip; a miss is
//!   fetched live and stored if successful. A miss that cannot be fetched, or
//!   comes back with a non-2xx status, becomes the empty 503.
//! - Page loads are served **Network-First**: the live response wins and
//!   refreshes the store; on network failure the stored snapshot is used, and
//!   failing that the offline page.
//!
//! ### Store writes
//! - Writes run on spawned tasks and never delay the response.
//! - A write whose generation was retired by a newer worker is dropped.
//! - A store that cannot be read or written is logged and bypassed, so the
//!   proxy degrades to an uncached pass-through.

use std::sync::{Arc, Mutex, PoisonError};

use shellcache_core::{CacheStore, Error, RequestKey};
use tokio::task::JoinHandle;

use crate::classify::{ClassifierRules, RequestClass};
use crate::fetch::Transport;
use crate::message::{ProxyRequest, ProxyResponse};
use crate::offline;

/// Request handler bound to one active cache generation.
pub struct CachingProxy {
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    rules: ClassifierRules,
    generation: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CachingProxy {
    pub fn new(
        store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, rules: ClassifierRules,
        generation: impl Into<String>,
    ) -> Self {
        Self { store, transport, rules, generation: generation.into(), pending: Mutex::new(Vec::new()) }
    }

    /// The generation lookups and writes go to.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Produce the response for an intercepted request. Never fails.
    pub async fn handle(&self, request: &ProxyRequest) -> ProxyResponse {
        let class = self.rules.classify(&request.method, &request.url);
        tracing::debug!(method = %request.method, url = %request.url, ?class, "intercepted request");

        match class {
            RequestClass::NonCacheable => self.forward(request).await,
            class if class.is_cache_first() => self.cache_first(request).await,
            _ => self.network_first(request).await,
        }
    }

    /// Send a request to the network without consulting the store.
    ///
    /// A failed exchange becomes the empty 503 rather than an error.
    pub async fn forward(&self, request: &ProxyRequest) -> ProxyResponse {
        match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("pass-through {} {} failed: {e}", request.method, request.url);
                ProxyResponse::unavailable()
            }
        }
    }

    /// Serve from the active generation, else fetch and store.
    ///
    /// Both a failed exchange and a non-2xx status count as a failed fetch
    /// and yield the empty 503.
    async fn cache_first(&self, request: &ProxyRequest) -> ProxyResponse {
        let key = request.key();

        if let Some(hit) = self.lookup(&key).await {
            tracing::debug!("cache hit for {key}");
            return hit;
        }

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                self.store_in_background(key, &response);
                response
            }
            Ok(response) => {
                tracing::debug!("cache miss for {key} fetched status {}", response.status.as_u16());
                ProxyResponse::unavailable()
            }
            Err(e) => {
                tracing::debug!("cache miss and fetch failed for {key}: {e}");
                ProxyResponse::unavailable()
            }
        }
    }

    async fn network_first(&self, request: &ProxyRequest) -> ProxyResponse {
        let key = request.key();

        match self.transport.send(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_in_background(key, &response);
                }
                response
            }
            Err(e) => {
                tracing::debug!("fetch failed for {key}, falling back to cache: {e}");
                match self.lookup(&key).await {
                    Some(hit) => hit,
                    None => {
                        tracing::debug!("no cached copy of {key}, serving offline page");
                        offline::respond()
                    }
                }
            }
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Option<ProxyResponse> {
        match self.store.lookup(&self.generation, key).await {
            Ok(entry) => entry.map(ProxyResponse::from),
            Err(e) => {
                tracing::warn!(generation = %self.generation, "cache lookup failed for {key}: {e}");
                None
            }
        }
    }

    fn store_in_background(&self, key: RequestKey, response: &ProxyResponse) {
        let entry = response.to_cached(key);
        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();

        let handle = tokio::spawn(async move {
            match store.put(&generation, &entry).await {
                Ok(()) => tracing::debug!("stored {} in {generation}", entry.key),
                Err(Error::GenerationRetired(_)) => {
                    tracing::debug!("generation {generation} retired, dropping write for {}", entry.key);
                }
                Err(e) => tracing::warn!(%generation, "cache write failed for {}: {e}", entry.key),
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every store write scheduled so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("cache write task failed: {e}");
            }
        }
    }
}
