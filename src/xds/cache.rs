//! Versioned xDS resource caches.
//!
//! Each of the five resource families (CDS/EDS/RDS/LDS/SDS) gets its own
//! cache: a version string plus the current set of named `Any` resources.
//! A `tokio::sync::broadcast` channel fans out version bumps to every
//! concurrent stream so SotW subscribers and the ADS multiplexer both see
//! updates without polling.

use std::collections::BTreeMap;
use std::sync::RwLock;

use envoy_types::pb::google::protobuf::Any;
use tokio::sync::broadcast;

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const ENDPOINT_TYPE_URL: &str = "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const SECRET_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret";

#[derive(Debug, Clone)]
pub struct VersionedResources {
    pub version: String,
    pub resources: BTreeMap<String, Any>,
}

impl Default for VersionedResources {
    fn default() -> Self {
        Self { version: "0".to_string(), resources: BTreeMap::new() }
    }
}

/// One versioned resource set for a single type URL, with change
/// notification.
pub struct TypeCache {
    type_url: &'static str,
    state: RwLock<VersionedResources>,
    notify: broadcast::Sender<String>,
}

impl TypeCache {
    pub fn new(type_url: &'static str) -> Self {
        let (notify, _rx) = broadcast::channel(16);
        Self { type_url, state: RwLock::new(VersionedResources::default()), notify }
    }

    pub fn type_url(&self) -> &'static str {
        self.type_url
    }

    pub fn snapshot(&self) -> VersionedResources {
        self.state.read().expect("xds cache lock poisoned").clone()
    }

    pub fn version(&self) -> String {
        self.state.read().expect("xds cache lock poisoned").version.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.notify.subscribe()
    }

    /// Replace the resource set wholesale. A no-op when the new contents
    /// are byte-identical to what's already cached, so a DAG rebuild that
    /// changes nothing for this resource family never bumps its version.
    pub fn update(&self, resources: BTreeMap<String, Any>) {
        let mut state = self.state.write().expect("xds cache lock poisoned");
        if state.resources == resources {
            return;
        }
        let next_version = state
            .version
            .parse::<u64>()
            .unwrap_or(0)
            .checked_add(1)
            .unwrap_or(1)
            .to_string();
        state.version = next_version.clone();
        state.resources = resources;
        drop(state);
        let _ = self.notify.send(next_version);
    }
}

/// All five resource family caches, held behind `Arc` by the server and the
/// translator.
pub struct XdsCaches {
    pub clusters: TypeCache,
    pub endpoints: TypeCache,
    pub routes: TypeCache,
    pub listeners: TypeCache,
    pub secrets: TypeCache,
}

impl Default for XdsCaches {
    fn default() -> Self {
        Self {
            clusters: TypeCache::new(CLUSTER_TYPE_URL),
            endpoints: TypeCache::new(ENDPOINT_TYPE_URL),
            routes: TypeCache::new(ROUTE_TYPE_URL),
            listeners: TypeCache::new(LISTENER_TYPE_URL),
            secrets: TypeCache::new(SECRET_TYPE_URL),
        }
    }
}

impl XdsCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_type_url(&self, type_url: &str) -> Option<&TypeCache> {
        match type_url {
            CLUSTER_TYPE_URL => Some(&self.clusters),
            ENDPOINT_TYPE_URL => Some(&self.endpoints),
            ROUTE_TYPE_URL => Some(&self.routes),
            LISTENER_TYPE_URL => Some(&self.listeners),
            SECRET_TYPE_URL => Some(&self.secrets),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_update_does_not_bump_version() {
        let cache = TypeCache::new(CLUSTER_TYPE_URL);
        let mut resources = BTreeMap::new();
        resources.insert("a".to_string(), Any { type_url: CLUSTER_TYPE_URL.to_string(), value: vec![1] });

        cache.update(resources.clone());
        let v1 = cache.version();
        cache.update(resources);
        assert_eq!(cache.version(), v1);
    }

    #[test]
    fn changed_update_bumps_version() {
        let cache = TypeCache::new(CLUSTER_TYPE_URL);
        let mut resources = BTreeMap::new();
        resources.insert("a".to_string(), Any { type_url: CLUSTER_TYPE_URL.to_string(), value: vec![1] });
        cache.update(resources);
        let v1 = cache.version();

        let mut resources = BTreeMap::new();
        resources.insert("a".to_string(), Any { type_url: CLUSTER_TYPE_URL.to_string(), value: vec![2] });
        cache.update(resources);
        assert_ne!(cache.version(), v1);
    }
}
