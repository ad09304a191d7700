//! Network transport used by the proxy and the lifecycle manager.
//!
//! ### Transport boundary
//! - `Transport` is the only way the caching layer reaches the network.
//! - Request semantics are not altered: method, URL, headers and body are
//!   forwarded as intercepted.
//! - Non-2xx statuses are returned as responses; only a failed exchange
//!   (unreachable host, refused connection, timeout) is an error.
//!
//! ### Timeouts
//! - The client carries the platform timeout; the proxy adds none.
//! - Timeout and network errors both route to a strategy's failure branch.

pub mod url;

use reqwest::header::{CONTENT_LENGTH, HOST};
use reqwest::Client;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use crate::message::{ProxyRequest, ProxyResponse, ResponseSource};
use shellcache_core::{AppConfig, Error};

/// A request/response exchange with the network.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange. Errors mean no response was received.
    async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string used when the request carries none (default: "shellcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "shellcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed transport.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            user_agent = %config.user_agent,
            timeout_ms = config.timeout.as_millis() as u64,
            "fetch client ready"
        );
        Ok(Self { http })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait::async_trait]
impl Transport for FetchClient {
    async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let start = Instant::now();

        let mut headers = request.headers.clone();
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);

        let mut builder = self.http.request(request.method.clone(), request.url.clone()).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(
            "{} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ProxyResponse { status, headers, body, source: ResponseSource::Network })
    }
}
