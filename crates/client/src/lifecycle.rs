//! Install/activate lifecycle of a cache generation.
//!
//! `Idle -> Installing -> Installed -> Activating -> Active`
//!
//! Install opens the current generation and precaches the application shell.
//! Activate deletes every other generation and promotes the current one, after
//! which the proxy serves all open browser contexts.

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, Url};
use serde::Serialize;
use shellcache_core::{AppConfig, CacheStore, Error, PrecachePolicy};
use tokio::sync::RwLock;

use crate::fetch::{Transport, resolve};
use crate::message::ProxyRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Installing,
    Installed,
    Activating,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        };
        f.write_str(name)
    }
}

/// A manifest resource that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of an install event.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    /// Manifest URLs stored, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    /// Take over from any previous generation without waiting.
    pub skip_waiting: bool,
}

/// Outcome of an activate event.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub generation: String,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// All open browser contexts are served from now on.
    pub clients_claimed: bool,
}

/// Drives a single generation through install and activation.
pub struct LifecycleManager {
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    generation: String,
    manifest: Vec<Url>,
    policy: PrecachePolicy,
    state: RwLock<LifecycleState>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, generation: impl Into<String>, manifest: Vec<Url>,
        policy: PrecachePolicy,
    ) -> Self {
        Self {
            store,
            transport,
            generation: generation.into(),
            manifest,
            policy,
            state: RwLock::new(LifecycleState::Idle),
        }
    }

    /// Build from configuration, resolving manifest paths against the origin.
    pub fn from_config(
        config: &AppConfig, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = config
            .precache
            .iter()
            .map(|path| resolve(&origin, path).map_err(|e| Error::InvalidUrl(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(store, transport, config.cache_name.clone(), manifest, config.precache_policy))
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Move `from -> to` atomically, or report the state that blocked it.
    async fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidTransition { from: state.to_string(), to: to.to_string() });
        }
        *state = to;
        tracing::info!(generation = %self.generation, "lifecycle {from} -> {to}");
        Ok(())
    }

    async fn reset(&self, to: LifecycleState) {
        *self.state.write().await = to;
    }

    /// Handle the install event.
    ///
    /// Opens the generation and stores every fetchable manifest resource.
    /// Under `PrecachePolicy::BestEffort` unfetchable resources are logged and
    /// listed in the report; under `Strict` the first one aborts installation,
    /// the half-filled generation is dropped and the state returns to `Idle`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(LifecycleState::Idle, LifecycleState::Installing).await?;

        match self.precache().await {
            Ok(report) => {
                self.reset(LifecycleState::Installed).await;
                tracing::info!(
                    generation = %self.generation,
                    cached = report.cached.len(),
                    failed = report.failed.len(),
                    "installed"
                );
                Ok(report)
            }
            Err(e) => {
                self.reset(LifecycleState::Idle).await;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        self.store.open(&self.generation).await?;

        let mut cached = Vec::with_capacity(self.manifest.len());
        let mut failed = Vec::new();

        for url in &self.manifest {
            match self.precache_one(url).await {
                Ok(()) => cached.push(url.to_string()),
                Err(reason) => {
                    tracing::warn!(generation = %self.generation, "failed to precache {url}: {reason}");
                    if self.policy == PrecachePolicy::Strict {
                        if let Err(e) = self.store.delete(&self.generation).await {
                            tracing::warn!(generation = %self.generation, "failed to drop partial generation: {e}");
                        }
                        return Err(Error::PrecacheFailed(format!("{url}: {reason}")));
                    }
                    failed.push(PrecacheFailure { url: url.to_string(), reason });
                }
            }
        }

        Ok(InstallReport { generation: self.generation.clone(), cached, failed, skip_waiting: true })
    }

    async fn precache_one(&self, url: &Url) -> Result<(), String> {
        let request = ProxyRequest::new(Method::GET, url.clone());
        let response = self.transport.send(&request).await.map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("status {}", response.status.as_u16()));
        }
        self.store
            .put(&self.generation, &response.to_cached(request.key()))
            .await
            .map_err(|e| e.to_string())
    }

    /// Handle the activate event.
    ///
    /// Deletes every generation other than the current one, then marks the
    /// current one active. On failure the state returns to `Installed` so the
    /// event can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating).await?;

        match self.purge_and_promote().await {
            Ok(report) => {
                self.reset(LifecycleState::Active).await;
                tracing::info!(generation = %self.generation, deleted = report.deleted.len(), "activated");
                Ok(report)
            }
            Err(e) => {
                self.reset(LifecycleState::Installed).await;
                Err(e)
            }
        }
    }

    async fn purge_and_promote(&self) -> Result<ActivateReport, Error> {
        let mut deleted = Vec::new();
        for generation in self.store.generations().await? {
            if generation.name != self.generation {
                self.store.delete(&generation.name).await?;
                tracing::debug!("deleted stale generation {}", generation.name);
                deleted.push(generation.name);
            }
        }

        self.store.open(&self.generation).await?;
        self.store.mark_active(&self.generation).await?;

        Ok(ActivateReport { generation: self.generation.clone(), deleted, clients_claimed: true })
    }
}
