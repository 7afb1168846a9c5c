//! Structured logging helpers.

/// Span for a single xDS stream lifecycle, attached to every request/response
/// logged while that stream is open.
#[macro_export]
macro_rules! xds_span {
    ($operation:expr, $node_id:expr) => {
        tracing::info_span!(
            "xds_stream",
            operation = %$operation,
            node_id = %$node_id,
        )
    };
}

/// Span for a single DAG rebuild, from coalesced event to published caches.
#[macro_export]
macro_rules! rebuild_span {
    ($sequence:expr) => {
        tracing::info_span!("dag_rebuild", sequence = %$sequence)
    };
}

/// Log the effective configuration once at startup.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        http_listener = %format!("{}:{}", config.listeners.http_address, config.listeners.http_port),
        https_listener = %format!("{}:{}", config.listeners.https_address, config.listeners.https_port),
        xds_listener = %config.xds.bind_address,
        xds_port = config.xds.port,
        ingress_class = ?config.dag.ingress_class,
        debug_surface_enabled = config.debug.enabled,
        "edgeplane control plane configuration"
    );
}
