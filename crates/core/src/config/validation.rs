//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_slash_delimited(prefix: &str) -> bool {
    prefix.len() > 1 && prefix.starts_with('/') && prefix.ends_with('/')
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` or `user_agent` is empty
    /// - `origin` is not an http(s) URL with a host
    /// - a path prefix does not start and end with `/`
    /// - a precache path is not absolute
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }
        let Some(origin_host) = origin.host_str() else {
            return Err(invalid("origin", "must include a host"));
        };

        if !is_slash_delimited(&self.api_prefix) {
            return Err(invalid("api_prefix", "must start and end with '/'"));
        }
        if !is_slash_delimited(&self.static_prefix) {
            return Err(invalid("static_prefix", "must start and end with '/'"));
        }
        if let Some(bad) = self.bypass_prefixes.iter().find(|p| !is_slash_delimited(p)) {
            return Err(invalid("bypass_prefixes", format!("{bad} must start and end with '/'")));
        }

        if let Some(bad) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("{bad} is not an absolute path")));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.host_allowlist.iter().any(|h| h.eq_ignore_ascii_case(origin_host)) {
            tracing::warn!(
                origin = %self.origin,
                "host_allowlist contains the origin host; \
                 same-origin pages from it will be served Cache-First"
            );
        }

        Ok(())
    }
}
