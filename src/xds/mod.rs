//! Envoy xDS gRPC surface.
//!
//! [`cache`] holds the versioned per-type resource sets, [`translator`]
//! pushes a freshly built [`crate::dag::Dag`] into them, [`visitors`] does
//! the actual DAG-to-protobuf conversion per resource family, and
//! [`server`] exposes them all over one ADS stream.

pub mod cache;
pub mod server;
pub mod translator;
pub mod visitors;

pub use cache::XdsCaches;
pub use server::AdsService;

use std::future::Future;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::config::XdsConfig;
use crate::errors::Result;
use crate::observability::GrpcTracingLayer;

use envoy_types::pb::envoy::service::discovery::v3::aggregated_discovery_service_server::AggregatedDiscoveryServiceServer;

/// Start the ADS gRPC server. Runs until `shutdown` resolves.
pub async fn serve<F>(config: &XdsConfig, caches: Arc<XdsCaches>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let ads_service = AdsService::new(caches);

    info!(address = %addr, "starting xDS ADS server");

    Server::builder()
        .layer(GrpcTracingLayer::new())
        .add_service(AggregatedDiscoveryServiceServer::new(ads_service))
        .serve_with_shutdown(addr, shutdown)
        .await
        .map_err(|e| crate::errors::Error::transport(format!("xDS server failed: {e}")))?;

    Ok(())
}
