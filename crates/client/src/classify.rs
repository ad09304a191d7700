//! Request classification.
//!
//! Maps a request to the handling category that picks its caching strategy.
//! Rules are evaluated in order and the first match wins:
//!
//! 1. any method other than GET → [`RequestClass::NonCacheable`]
//! 2. path under the API prefix or a bypass prefix → [`RequestClass::NonCacheable`]
//! 3. host on the allowlist → [`RequestClass::ThirdPartyAsset`]
//! 4. path under the static prefix → [`RequestClass::StaticAsset`]
//! 5. everything else → [`RequestClass::Navigational`]

use std::collections::HashSet;

use reqwest::{Method, Url};
use serde::Serialize;
use shellcache_core::AppConfig;

/// Handling category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    /// Writes and dynamic-data reads; always forwarded untouched.
    NonCacheable,
    /// Asset from an allowlisted external host; Cache-First.
    ThirdPartyAsset,
    /// Asset under the static prefix; Cache-First.
    StaticAsset,
    /// Page load; Network-First.
    Navigational,
}

impl RequestClass {
    /// Whether requests of this class are served Cache-First.
    pub fn is_cache_first(self) -> bool {
        matches!(self, RequestClass::ThirdPartyAsset | RequestClass::StaticAsset)
    }
}

/// The static rule set classification runs against.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    api_prefix: String,
    static_prefix: String,
    bypass_prefixes: Vec<String>,
    host_allowlist: HashSet<String>,
}

impl ClassifierRules {
    pub fn new(
        api_prefix: impl Into<String>, static_prefix: impl Into<String>, bypass_prefixes: Vec<String>,
        host_allowlist: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            static_prefix: static_prefix.into(),
            bypass_prefixes,
            host_allowlist: host_allowlist.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.api_prefix.clone(),
            config.static_prefix.clone(),
            config.bypass_prefixes.clone(),
            config.host_allowlist.iter().cloned(),
        )
    }

    /// Classify a request by method and URL.
    pub fn classify(&self, method: &Method, url: &Url) -> RequestClass {
        if *method != Method::GET {
            return RequestClass::NonCacheable;
        }

        let path = url.path();
        if path.starts_with(&self.api_prefix) || self.bypass_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return RequestClass::NonCacheable;
        }

        if let Some(host) = url.host_str()
            && self.host_allowlist.contains(&host.to_ascii_lowercase())
        {
            return RequestClass::ThirdPartyAsset;
        }

        if path.starts_with(&self.static_prefix) {
            return RequestClass::StaticAsset;
        }

        RequestClass::Navigational
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
