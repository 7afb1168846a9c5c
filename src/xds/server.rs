//! Aggregated Discovery Service.
//!
//! One bidirectional stream multiplexes all five resource types. Each
//! incoming `DiscoveryRequest` updates that type's subscription (and is
//! treated as an ACK/NACK of the previous push if the nonce matches); each
//! version bump on any [`crate::xds::cache::TypeCache`] triggers an
//! unprompted push to every subscribed stream.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use envoy_types::pb::envoy::service::discovery::v3::aggregated_discovery_service_server::AggregatedDiscoveryService;
use envoy_types::pb::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};

use crate::xds::cache::XdsCaches;

pub type DiscoveryStream = Pin<Box<dyn Stream<Item = Result<DiscoveryResponse, Status>> + Send + 'static>>;

pub struct AdsService {
    caches: Arc<XdsCaches>,
}

impl AdsService {
    pub fn new(caches: Arc<XdsCaches>) -> Self {
        Self { caches }
    }
}

#[tonic::async_trait]
impl AggregatedDiscoveryService for AdsService {
    type StreamAggregatedResourcesStream = DiscoveryStream;

    async fn stream_aggregated_resources(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamAggregatedResourcesStream>, Status> {
        let mut in_stream = request.into_inner();
        let (tx, rx) = mpsc::channel(64);
        let caches = self.caches.clone();

        tokio::spawn(async move {
            let mut subscribed: HashMap<String, ()> = HashMap::new();
            let mut receivers = Vec::new();
            for cache in [&caches.clusters, &caches.endpoints, &caches.routes, &caches.listeners, &caches.secrets] {
                receivers.push((cache.type_url(), cache.subscribe()));
            }

            loop {
                tokio::select! {
                    request = in_stream.next() => {
                        match request {
                            Some(Ok(req)) => {
                                debug!(type_url = %req.type_url, version = %req.version_info, "xds request");
                                if req.error_detail.is_some() {
                                    warn!(type_url = %req.type_url, detail = ?req.error_detail, "envoy NACKed resources");
                                }
                                subscribed.insert(req.type_url.clone(), ());
                                if let Some(response) = response_for(&caches, &req.type_url) {
                                    if tx.send(Ok(response)).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Err(status)) => {
                                warn!(%status, "xds stream error");
                                return;
                            }
                            None => {
                                info!("xds stream closed by client");
                                return;
                            }
                        }
                    }
                    changed = next_change(&mut receivers) => {
                        let Some(type_url) = changed else { continue };
                        if !subscribed.contains_key(type_url) {
                            continue;
                        }
                        if let Some(response) = response_for(&caches, type_url) {
                            if tx.send(Ok(response)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        let out_stream = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(out_stream)))
    }
}

fn response_for(caches: &XdsCaches, type_url: &str) -> Option<DiscoveryResponse> {
    let cache = caches.by_type_url(type_url)?;
    let snapshot = cache.snapshot();
    Some(DiscoveryResponse {
        version_info: snapshot.version.clone(),
        resources: snapshot.resources.into_values().collect(),
        type_url: type_url.to_string(),
        nonce: snapshot.version,
        ..Default::default()
    })
}

async fn next_change(
    receivers: &mut [(&'static str, tokio::sync::broadcast::Receiver<String>)],
) -> Option<&'static str> {
    // Poll every receiver; the first one with a pending change wins this tick.
    for (type_url, rx) in receivers.iter_mut() {
        if rx.try_recv().is_ok() {
            return Some(type_url);
        }
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    None
}
