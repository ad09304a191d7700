//! Worker runtime: the three platform entry points.
//!
//! Owns one lifecycle manager and one proxy bound to the same generation,
//! store and transport. Until activation completes the worker controls no
//! page, so fetch events go straight to the network.

use std::sync::Arc;

use shellcache_core::{AppConfig, CacheStore, EntryMeta, Error, Generation};

use crate::classify::{ClassifierRules, RequestClass};
use crate::fetch::Transport;
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleManager, LifecycleState};
use crate::message::{ProxyRequest, ProxyResponse};
use crate::proxy::CachingProxy;

pub struct WorkerRuntime {
    store: Arc<dyn CacheStore>,
    lifecycle: LifecycleManager,
    proxy: CachingProxy,
}

impl WorkerRuntime {
    pub fn new(config: &AppConfig, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let lifecycle = LifecycleManager::from_config(config, Arc::clone(&store), Arc::clone(&transport))?;
        let proxy =
            CachingProxy::new(Arc::clone(&store), transport, ClassifierRules::from_config(config), &config.cache_name);
        Ok(Self { store, lifecycle, proxy })
    }

    pub fn generation(&self) -> &str {
        self.lifecycle.generation()
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.state().await
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    /// Category the proxy would handle this request under once active.
    pub fn classify(&self, request: &ProxyRequest) -> RequestClass {
        self.proxy.rules().classify(&request.method, &request.url)
    }

    /// Handle a fetch event.
    pub async fn fetch(&self, request: &ProxyRequest) -> ProxyResponse {
        if self.lifecycle.state().await == LifecycleState::Active {
            self.proxy.handle(request).await
        } else {
            tracing::debug!("worker not active, forwarding {} {}", request.method, request.url);
            self.proxy.forward(request).await
        }
    }

    /// Entries of the generation this runtime owns.
    pub async fn entries(&self) -> Result<Vec<EntryMeta>, Error> {
        self.store.entries(self.generation()).await
    }

    /// Every generation currently in the store, including ones awaiting cleanup.
    pub async fn generations(&self) -> Result<Vec<Generation>, Error> {
        self.store.generations().await
    }

    /// Wait for pending cache writes, e.g. before shutdown.
    pub async fn settle(&self) {
        self.proxy.settle().await;
    }
}
