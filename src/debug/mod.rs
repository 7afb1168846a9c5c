//! Debug HTTP surface.
//!
//! A read-only view of the current DAG and xDS caches for operators,
//! separate from the gRPC xDS port so it can be bound to loopback only.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::dag::DagHandle;
use crate::xds::XdsCaches;

#[derive(Clone)]
pub struct DebugState {
    pub dag: DagHandle,
    pub caches: Arc<XdsCaches>,
}

pub fn router(state: DebugState) -> Router {
    Router::new()
        .route("/config/clusters", get(clusters))
        .route("/config/listeners", get(listeners))
        .route("/config/routes/:name", get(route_config))
        .route("/config/endpoints/:cluster", get(endpoints_for_cluster))
        .route("/config/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct ClusterSummary {
    name: String,
    service: String,
    port_id: String,
    weight: u32,
}

async fn clusters(State(state): State<DebugState>) -> Json<Vec<ClusterSummary>> {
    let dag = crate::dag::load(&state.dag);
    let summaries = dag
        .all_clusters()
        .into_iter()
        .map(|c| ClusterSummary {
            name: c.name.clone(),
            service: c.service.to_string(),
            port_id: c.port_id.clone(),
            weight: c.weight,
        })
        .collect();
    Json(summaries)
}

#[derive(Serialize)]
struct ListenerSummary {
    name: String,
    address: String,
    port: u16,
    domains: Vec<String>,
}

async fn listeners(State(state): State<DebugState>) -> Json<Vec<ListenerSummary>> {
    let dag = crate::dag::load(&state.dag);
    let summaries = dag
        .listeners
        .iter()
        .map(|l| ListenerSummary {
            name: l.name.clone(),
            address: l.address.clone(),
            port: l.port,
            domains: l
                .virtual_hosts
                .iter()
                .map(|vh| vh.fqdn.clone())
                .chain(l.secure_virtual_hosts.iter().map(|svh| svh.virtualhost.fqdn.clone()))
                .collect(),
        })
        .collect();
    Json(summaries)
}

async fn route_config(State(state): State<DebugState>, Path(name): Path<String>) -> Json<Option<serde_json::Value>> {
    let snapshot = state.caches.routes.snapshot();
    let value = snapshot.resources.get(&name).map(|any| {
        serde_json::json!({ "type_url": any.type_url, "bytes": any.value.len() })
    });
    Json(value)
}

async fn endpoints_for_cluster(
    State(state): State<DebugState>,
    Path(cluster): Path<String>,
) -> Json<Option<serde_json::Value>> {
    let snapshot = state.caches.endpoints.snapshot();
    let value = snapshot.resources.get(&cluster).map(|any| {
        serde_json::json!({ "type_url": any.type_url, "bytes": any.value.len() })
    });
    Json(value)
}

#[derive(Serialize)]
struct StatusEntry {
    object: String,
    status: String,
}

async fn status(State(state): State<DebugState>) -> Json<Vec<StatusEntry>> {
    let dag = crate::dag::load(&state.dag);
    let entries = dag
        .statuses
        .iter()
        .map(|(key, status)| StatusEntry {
            object: key.to_string(),
            status: format!("{status:?}"),
        })
        .collect();
    Json(entries)
}
