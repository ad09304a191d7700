//! Request-caching layer for shellcache.
//!
//! This crate provides the interception proxy (Cache-First / Network-First),
//! the install/activate lifecycle, the offline fallback page and the network
//! transport they share.

pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod offline;
pub mod proxy;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use classify::{ClassifierRules, RequestClass};
pub use fetch::{FetchClient, FetchConfig, Transport};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleManager, LifecycleState, PrecacheFailure};
pub use message::{ProxyRequest, ProxyResponse, ResponseSource};
pub use proxy::CachingProxy;
pub use runtime::WorkerRuntime;
