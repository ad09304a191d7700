//! Request-key derivation for cache entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the cache key for a request from its method and canonical URL.
///
/// The method is upper-cased so `get` and `GET` address the same entry.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a stored request: method, canonical URL and their hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
    pub hash: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string(), hash: compute_request_key(method, url) }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "https://example.com/");
        let hash2 = compute_request_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_request_key("GET", "https://example.com/");
        let head = compute_request_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        let lower = compute_request_key("get", "https://example.com/");
        assert_eq!(lower, compute_request_key("GET", "https://example.com/"));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_key_display() {
        let key = RequestKey::new("get", "http://localhost:8000/dashboard");
        assert_eq!(key.method, "GET");
        assert_eq!(key.to_string(), "GET http://localhost:8000/dashboard");
    }
}
