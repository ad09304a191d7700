//! Offline fallback page.
//!
//! Served for a page load when the network is unreachable and the active
//! generation holds nothing for the URL. Built from a constant; never touches
//! the network or the store.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::message::{ProxyResponse, ResponseSource};

pub const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline</title>
<style>
body{margin:0;min-height:100vh;display:flex;align-items:center;justify-content:center;font-family:system-ui,sans-serif;background:#f5f6f8;color:#1f2933}
main{text-align:center;padding:2rem}
h1{font-size:1.5rem;margin:0 0 .5rem}
p{margin:0 0 1.5rem;color:#52606d}
button{padding:.6rem 1.4rem;border:0;border-radius:6px;background:#2563eb;color:#fff;font-size:1rem;cursor:pointer}
</style>
</head>
<body>
<main>
<h1>You are offline</h1>
<p>This page is not available without a network connection. Check your connection and try again.</p>
<button type="button" onclick="location.reload()">Retry</button>
</main>
</body>
</html>
"#;

/// Synthesize the offline page.
///
/// Status 200 with an HTML content type so the browser renders it instead of
/// its own network error page.
pub fn respond() -> ProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    ProxyResponse {
        status: StatusCode::OK,
        headers,
        body: Bytes::from_static(OFFLINE_HTML.as_bytes()),
        source: ResponseSource::Offline,
    }
}
