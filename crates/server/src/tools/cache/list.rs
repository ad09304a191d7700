//! cache_list tool implementation.
//!
//! Reports the worker's lifecycle state and what its generation holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use shellcache_client::{LifecycleState, WorkerRuntime};
use shellcache_core::{EntryMeta, Generation};

use crate::tools::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheListOutput {
    /// Lifecycle state of this worker.
    pub state: LifecycleState,
    /// Generation this worker owns.
    pub generation: String,
    /// Every generation present in the store.
    pub generations: Vec<Generation>,
    /// Entries of this worker's generation.
    pub entries: Vec<EntryMeta>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(runtime: &WorkerRuntime) -> Result<CallToolResult, McpError> {
    let output = CacheListOutput {
        state: runtime.state().await,
        generation: runtime.generation().to_string(),
        generations: runtime.generations().await?,
        entries: runtime.entries().await?,
    };

    json_result(&output, "cache listing")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_client::{FetchClient, FetchConfig};
    use shellcache_core::{AppConfig, CacheDb};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_empty_store() {
        let config = AppConfig::default();
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let transport = Arc::new(FetchClient::new(FetchConfig::from(&config)).unwrap());
        let runtime = WorkerRuntime::new(&config, store, transport).unwrap();

        assert!(list_impl(&runtime).await.is_ok());
        assert!(runtime.generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sees_other_generations() {
        let config = AppConfig::default();
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        store.create_generation("depot-shell-v0").await.unwrap();
        let transport = Arc::new(FetchClient::new(FetchConfig::from(&config)).unwrap());
        let runtime = WorkerRuntime::new(&config, store, transport).unwrap();

        assert!(list_impl(&runtime).await.is_ok());
        let generations = runtime.generations().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].name, "depot-shell-v0");
        assert!(runtime.entries().await.unwrap().is_empty());
    }
}
