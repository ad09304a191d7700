//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes platform events to the worker runtime.
use std::sync::Arc;

use crate::tools::{ProxyFetchParams, activate_impl, cache::list_impl, install_impl, proxy_fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_client::WorkerRuntime;

/// The main MCP server handler for shellcache-host.
#[derive(Clone)]
pub struct ShellCacheServer {
    tool_router: ToolRouter<Self>,
    runtime: Arc<WorkerRuntime>,
}

#[tool_router]
impl ShellCacheServer {
    pub fn new(runtime: Arc<WorkerRuntime>) -> Self {
        Self { tool_router: Self::tool_router(), runtime }
    }

    #[tool(description = "Deliver the install event. Precaches the app shell into this worker's cache generation \
                          and returns which resources were stored or skipped.")]
    async fn lifecycle_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.runtime).await
    }

    #[tool(description = "Deliver the activate event. Deletes every other cache generation and starts \
                          intercepting fetches.")]
    async fn lifecycle_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.runtime).await
    }

    /// Intercept one outbound request.
    ///
    /// Static and third-party assets are served Cache-First, same-origin page
    /// loads Network-First with the offline page as last resort. API calls,
    /// non-GET requests and bypassed paths go straight to the network.
    #[tool(description = "Deliver a fetch event. Returns the response the page would receive and whether it came \
                          from the network, the cache or the offline fallback.")]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        proxy_fetch_impl(&self.runtime, params.0).await
    }

    #[tool(description = "List the worker's lifecycle state, the cache generations in the store and the entries \
                          held by this worker's generation.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.runtime).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache-host".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Call lifecycle_install, then lifecycle_activate, then route page requests through proxy_fetch.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_client::{FetchClient, FetchConfig};
    use shellcache_core::{AppConfig, CacheDb};

    #[tokio::test]
    async fn test_lists_every_tool() {
        let config = AppConfig::default();
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let transport = Arc::new(FetchClient::new(FetchConfig::from(&config)).unwrap());
        let server = ShellCacheServer::new(Arc::new(WorkerRuntime::new(&config, store, transport).unwrap()));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_list", "lifecycle_activate", "lifecycle_install", "proxy_fetch"]);
    }
}
