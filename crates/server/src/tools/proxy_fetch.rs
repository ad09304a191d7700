//! proxy_fetch tool implementation.
//!
//! Delivers one fetch event to the worker and reports the response the page
//! would receive.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{ProxyRequest, ProxyResponse, RequestClass, ResponseSource, WorkerRuntime};

use super::json_result;

/// Input parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// HTTP method (default: "GET").
    #[serde(default = "default_method")]
    pub method: String,

    /// Absolute http(s) URL of the intercepted request.
    pub url: String,

    /// Request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Request body as UTF-8 text.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// Output structure for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// Canonical URL the request was handled under.
    pub url: String,
    /// Category the classifier assigned.
    pub class: RequestClass,
    /// HTTP status returned to the page.
    pub status: u16,
    /// Response headers in wire order.
    pub headers: Vec<HeaderPair>,
    /// Response body, lossily decoded as UTF-8.
    pub body: String,
    pub body_len: usize,
    /// Where the response came from.
    pub source: ResponseSource,
}

impl ProxyFetchOutput {
    fn new(request: &ProxyRequest, class: RequestClass, response: ProxyResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| HeaderPair {
                name: name.as_str().to_string(),
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })
            .collect();

        Self {
            url: request.url.to_string(),
            class,
            status: response.status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_len: response.body.len(),
            source: response.source,
        }
    }
}

/// Build the intercepted request from tool parameters.
fn build_request(params: ProxyFetchParams) -> Result<ProxyRequest, shellcache_core::Error> {
    let mut request = ProxyRequest::parse(&params.method, &params.url)?;
    for (name, value) in params.headers.unwrap_or_default() {
        request = request.try_with_header(&name, &value)?;
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the proxy_fetch tool.
///
/// Malformed input is a tool error. Network trouble never is: the worker
/// always produces a response, possibly synthesized.
pub async fn proxy_fetch_impl(runtime: &WorkerRuntime, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(params)?;
    let class = runtime.classify(&request);

    tracing::info!(class = ?class, "fetch event {} {}", request.method, request.url);
    let response = runtime.fetch(&request).await;

    json_result(&ProxyFetchOutput::new(&request, class, response), "fetch response")
}
