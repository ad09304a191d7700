//! shellcache-host entry point.
//!
//! Boots the worker runtime and exposes its platform events as MCP tools on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig, WorkerRuntime};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.cache_name,
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting shellcache host on stdio transport"
    );

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let transport = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let runtime = Arc::new(WorkerRuntime::new(&config, store, transport)?);

    let handler = handler::ShellCacheServer::new(Arc::clone(&runtime));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    runtime.settle().await;
    tracing::info!("shellcache host stopped");

    Ok(())
}
