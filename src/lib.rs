//! # edgeplane
//!
//! An infrastructure-agnostic control plane for Envoy ingress: it watches a
//! set of cluster objects (Kubernetes `Ingress`/`HTTPProxy`/`Service` or a
//! static fixture, depending on what's wired into [`cache::SourceCache`]),
//! builds a deterministic DAG of listeners, routes and clusters from them,
//! and serves the result to Envoy over the Aggregated Discovery Service.
//!
//! ## Pipeline
//!
//! ```text
//! source objects → SourceCache → event coalescer → DAG builder → xDS translator → ADS server
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod debug;
pub mod domain;
pub mod errors;
pub mod events;
pub mod observability;
pub mod utils;
pub mod xds;

pub use config::AppConfig;
pub use errors::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_looks_like_semver() {
        let components: Vec<_> = VERSION.split('.').collect();
        assert!(components.len() >= 3, "version should follow semver: {VERSION}");
        assert_eq!(APP_NAME, "edgeplane");
    }
}
