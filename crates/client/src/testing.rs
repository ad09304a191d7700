//! Scripted transport and store doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use shellcache_core::{CacheDb, CacheStore, CachedResponse, EntryMeta, Error, Generation, RequestKey};
use tokio::sync::watch;

use crate::fetch::Transport;
use crate::message::{ProxyRequest, ProxyResponse, ResponseSource};

/// Transport that answers from a route table.
///
/// Unrouted URLs get a 404; `fail` URLs and everything while offline get a
/// network error.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, (StatusCode, HeaderMap, Bytes)>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: StatusCode, content_type: &str, body: &str) {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, headers, Bytes::copy_from_slice(body.as_bytes())));
    }

    /// Append a response header to an existing route.
    pub fn add_header(&self, url: &str, name: &'static str, value: &'static str) {
        let mut routes = self.routes.lock().unwrap();
        let (_, headers, _) = routes.get_mut(url).unwrap();
        headers.append(name, HeaderValue::from_static(value));
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url.to_string();

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("network unreachable".into()));
        }
        if self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("connection refused: {url}")));
        }

        let route = self.routes.lock().unwrap().get(&url).cloned();
        let (status, headers, body) = route.unwrap_or_else(|| {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            (StatusCode::NOT_FOUND, headers, Bytes::from_static(b"not found"))
        });

        Ok(ProxyResponse { status, headers, body, source: ResponseSource::Network })
    }
}

/// SQLite store whose writes can be held back, so a test can control when a
/// background write lands.
pub struct GatedStore {
    inner: Arc<CacheDb>,
    open: watch::Sender<bool>,
}

impl GatedStore {
    /// Wrap `inner` with the gate open.
    pub fn new(inner: Arc<CacheDb>) -> Self {
        let (open, _) = watch::channel(true);
        Self { inner, open }
    }

    /// Make subsequent and in-flight `put` calls wait.
    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    /// Let every waiting `put` through.
    pub fn release(&self) {
        self.open.send_replace(true);
    }
}

#[async_trait::async_trait]
impl CacheStore for GatedStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        CacheStore::open(&*self.inner, generation).await
    }

    async fn generations(&self) -> Result<Vec<Generation>, Error> {
        self.inner.list_generations().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.inner.delete_generation(generation).await
    }

    async fn mark_active(&self, generation: &str) -> Result<(), Error> {
        CacheStore::mark_active(&*self.inner, generation).await
    }

    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.inner.get_entry(generation, key).await
    }

    async fn put(&self, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
        let mut open = self.open.subscribe();
        if open.wait_for(|open| *open).await.is_err() {
            return Err(Error::CorruptEntry("gate dropped".into()));
        }
        self.inner.put_entry(generation, entry).await
    }

    async fn entries(&self, generation: &str) -> Result<Vec<EntryMeta>, Error> {
        self.inner.list_entries(generation).await
    }
}

/// Store whose every operation fails, as if the database were unavailable.
#[derive(Default)]
pub struct FailingStore {
    pub calls: AtomicUsize,
}

impl FailingStore {
    fn fail<T>(&self) -> Result<T, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::CorruptEntry("store unavailable".into()))
    }
}

#[async_trait::async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, _generation: &str) -> Result<(), Error> {
        self.fail()
    }

    async fn generations(&self) -> Result<Vec<Generation>, Error> {
        self.fail()
    }

    async fn delete(&self, _generation: &str) -> Result<bool, Error> {
        self.fail()
    }

    async fn mark_active(&self, _generation: &str) -> Result<(), Error> {
        self.fail()
    }

    async fn lookup(&self, _generation: &str, _key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.fail()
    }

    async fn put(&self, _generation: &str, _entry: &CachedResponse) -> Result<(), Error> {
        self.fail()
    }

    async fn entries(&self, _generation: &str) -> Result<Vec<EntryMeta>, Error> {
        self.fail()
    }
}
