//! Request and response values exchanged across the proxy boundary.

use bytes::Bytes;
use reqwest::header::{
    CONNECTION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use shellcache_core::{CachedResponse, Error, RequestKey};

use crate::fetch::canonicalize;

/// Headers never written to the store: cookies set for one session and
/// hop-by-hop headers that describe a single connection.
const UNSTORED_HEADERS: &[&str] = &["set-cookie", "set-cookie2", "keep-alive", "proxy-connection"];

fn is_stored_header(name: &HeaderName) -> bool {
    let hop_by_hop = [CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE];
    !hop_by_hop.contains(name) && !UNSTORED_HEADERS.contains(&name.as_str())
}

/// An intercepted outbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// Build a request from a method name and URL string.
    ///
    /// The URL is canonicalized so equivalent spellings share a cache key.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {method:?}: {e}")))?;
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(method, url))
    }

    pub fn get(url: &str) -> Result<Self, Error> {
        Self::parse("GET", url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a header given as text, rejecting names or values HTTP forbids.
    pub fn try_with_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("invalid value for {name}: {e}")))?;
        Ok(self.with_header(name, value))
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Cache key for this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), self.url.as_str())
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live response from the network.
    Network,
    /// Snapshot from the active cache generation.
    Cache,
    /// Synthesized offline page.
    Offline,
    /// Synthesized empty failure response.
    Unavailable,
}

/// A response returned to the page.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ProxyResponse {
    /// Empty-bodied 503, returned when a sub-resource cannot be served.
    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            source: ResponseSource::Unavailable,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot this response for storage under `key`.
    ///
    /// Cookies and hop-by-hop headers are dropped; everything else keeps its
    /// wire order.
    pub fn to_cached(&self, key: RequestKey) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| is_stored_header(name))
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        CachedResponse::capture(key, self.status.as_u16(), headers, self.body.to_vec())
    }
}

impl From<CachedResponse> for ProxyResponse {
    fn from(entry: CachedResponse) -> Self {
        let mut headers = HeaderMap::with_capacity(entry.headers.len());
        for (name, value) in &entry.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value.as_bytes())) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("dropping unparseable cached header {name:?} for {}", entry.key),
            }
        }

        Self {
            status: StatusCode::from_u16(entry.status_code).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = ProxyRequest::parse("post", "http://localhost:8000/api/orders#top").unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.as_str(), "http://localhost:8000/api/orders");
    }

    #[test]
    fn test_parse_invalid_method() {
        let result = ProxyRequest::parse("GE T", "http://localhost:8000/");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_invalid_url() {
        let result = ProxyRequest::get("file:///etc/passwd");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_try_with_header() {
        let request = ProxyRequest::get("http://localhost:8000/").unwrap();
        let request = request.try_with_header("accept", "text/html").unwrap();
        assert_eq!(request.headers.get("accept").unwrap(), "text/html");

        let bad = ProxyRequest::get("http://localhost:8000/").unwrap().try_with_header("bad header", "x");
        assert!(matches!(bad, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = ProxyRequest::get("http://localhost:8000/orders#row-4").unwrap();
        let b = ProxyRequest::get("http://LOCALHOST:8000/orders").unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_unavailable() {
        let response = ProxyResponse::unavailable();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.body.is_empty());
        assert_eq!(response.source, ResponseSource::Unavailable);
    }

    #[test]
    fn test_cached_snapshot_preserves_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.append("vary", HeaderValue::from_static("accept-encoding"));
        headers.append("vary", HeaderValue::from_static("cookie"));
        let live = ProxyResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"body{}"),
            source: ResponseSource::Network,
        };

        let key = RequestKey::new("GET", "http://localhost:8000/static/app.css");
        let restored = ProxyResponse::from(live.to_cached(key));

        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.content_type(), Some("text/css"));
        assert_eq!(restored.headers.get_all("vary").iter().count(), 2);
        assert_eq!(restored.body, live.body);
        assert_eq!(restored.source, ResponseSource::Cache);
    }

    #[test]
    fn test_cached_snapshot_drops_cookies_and_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.append("set-cookie", HeaderValue::from_static("sessionid=abc123; HttpOnly"));
        headers.append("set-cookie", HeaderValue::from_static("csrftoken=xyz"));
        headers.insert("set-cookie2", HeaderValue::from_static("legacy=1"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        let live = ProxyResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"<h1>dashboard</h1>"),
            source: ResponseSource::Network,
        };

        let cached = live.to_cached(RequestKey::new("GET", "http://localhost:8000/dashboard"));
        assert_eq!(cached.headers, vec![("content-type".to_string(), "text/html".to_string())]);

        let restored = ProxyResponse::from(cached);
        assert!(restored.headers.get("set-cookie").is_none());
        assert!(restored.headers.get(TRANSFER_ENCODING).is_none());
        assert_eq!(restored.content_type(), Some("text/html"));
    }
}
