//! # Observability
//!
//! Structured logging via `tracing`, plus a small gRPC instrumentation layer
//! shared by the xDS server.

pub mod grpc_tracing;
pub mod logging;

pub use grpc_tracing::GrpcTracingLayer;
pub use logging::log_config_info;

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Safe to call once per process;
/// subsequent calls are reported as an error rather than panicking.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edgeplane={},tonic=info", config.log_level)));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json_logging {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    if let Err(e) = result {
        // A subscriber is already installed (e.g. a prior call in tests); not fatal.
        eprintln!("tracing subscriber already initialized: {e}");
    }

    info!(log_level = %config.log_level, json = config.json_logging, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic() {
        let config = ObservabilityConfig { log_level: "debug".to_string(), json_logging: false };
        assert!(init_tracing(&config).is_ok());
    }
}
