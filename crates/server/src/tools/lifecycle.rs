//! lifecycle_install and lifecycle_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_client::WorkerRuntime;

use super::json_result;

/// Deliver the install event: precache the shell into a fresh generation.
pub async fn install_impl(runtime: &WorkerRuntime) -> Result<CallToolResult, McpError> {
    let report = runtime.install().await?;
    json_result(&report, "install report")
}

/// Deliver the activate event: drop old generations and take control.
pub async fn activate_impl(runtime: &WorkerRuntime) -> Result<CallToolResult, McpError> {
    let report = runtime.activate().await?;
    json_result(&report, "activate report")
}
