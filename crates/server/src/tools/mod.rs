//! MCP tool implementations.
//!
//! Each tool delivers one platform event to the worker runtime and reports
//! the outcome as pretty-printed JSON.

pub mod cache;
pub mod lifecycle;
pub mod proxy_fetch;

pub use lifecycle::{activate_impl, install_impl};
pub use proxy_fetch::{ProxyFetchParams, proxy_fetch_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_core::Error;

/// Serialize a tool's output into a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T, what: &str) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize {what}: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
