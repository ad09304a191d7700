//! Application configuration with layered loading.
//!
//! The compiled-in defaults describe the deployed application shell: the
//! cache generation name, the precache manifest, the third-party host
//! allowlist and the path prefixes used to classify requests. figment layers
//! overrides on top of them:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// What installation does when a precache resource cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrecachePolicy {
    /// Log the failure and keep installing.
    #[default]
    BestEffort,
    /// Abort installation on the first unfetchable resource.
    Strict,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Identifier of the cache generation owned by this deployment.
    ///
    /// Bump it on every release that changes shell assets; activation purges
    /// every generation with a different name.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin the precache manifest paths are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application shell resources stored at install time, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Third-party hosts whose assets are served Cache-First.
    #[serde(default = "default_host_allowlist")]
    pub host_allowlist: Vec<String>,

    /// Dynamic-data path prefix that is never cached.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Static-resource path prefix served Cache-First.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Additional path prefixes that always go straight to the network.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    #[serde(default)]
    pub precache_policy: PrecachePolicy,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string sent when the intercepted request carries none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_name() -> String {
    "depot-shell-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_precache() -> Vec<String> {
    ["/", "/static/css/style.css", "/static/js/main.js", "/static/images/logo.png", "/static/favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_host_allowlist() -> Vec<String> {
    ["cdn.jsdelivr.net", "cdnjs.cloudflare.com", "fonts.googleapis.com", "fonts.gstatic.com", "unpkg.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/health/".into(), "/admin/".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            precache: default_precache(),
            host_allowlist: default_host_allowlist(),
            api_prefix: default_api_prefix(),
            static_prefix: default_static_prefix(),
            bypass_prefixes: default_bypass_prefixes(),
            precache_policy: PrecachePolicy::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
