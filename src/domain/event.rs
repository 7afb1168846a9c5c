use serde::{Deserialize, Serialize};

use super::{Endpoints, HttpProxy, Ingress, ObjectKey, Secret, Service, TlsCertificateDelegation};

/// Tagged union over every source object kind the cache tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterObject {
    Service(Service),
    Endpoints(Endpoints),
    Ingress(Ingress),
    HttpProxy(HttpProxy),
    Secret(Secret),
    TlsCertificateDelegation(TlsCertificateDelegation),
}

impl ClusterObject {
    pub fn key(&self) -> &ObjectKey {
        match self {
            ClusterObject::Service(o) => &o.key,
            ClusterObject::Endpoints(o) => &o.key,
            ClusterObject::Ingress(o) => &o.key,
            ClusterObject::HttpProxy(o) => &o.key,
            ClusterObject::Secret(o) => &o.key,
            ClusterObject::TlsCertificateDelegation(o) => &o.key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClusterObject::Service(_) => "Service",
            ClusterObject::Endpoints(_) => "Endpoints",
            ClusterObject::Ingress(_) => "Ingress",
            ClusterObject::HttpProxy(_) => "HTTPProxy",
            ClusterObject::Secret(_) => "Secret",
            ClusterObject::TlsCertificateDelegation(_) => "TLSCertificateDelegation",
        }
    }
}

/// A single observed change to the source cache. `Update` carries both the
/// previous and new object so handlers can diff them if they need to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterEvent {
    Add(ClusterObject),
    Update(ClusterObject, ClusterObject),
    Delete(ClusterObject),
}

impl ClusterEvent {
    pub fn key(&self) -> &ObjectKey {
        match self {
            ClusterEvent::Add(obj) | ClusterEvent::Delete(obj) => obj.key(),
            ClusterEvent::Update(_, new) => new.key(),
        }
    }

    /// Status-only or resourceVersion-only churn never reaches here: the
    /// cache's `PartialEq` impls already treat those as unchanged and skip
    /// emitting an `Update` for them.
    pub fn is_update(&self) -> bool {
        matches!(self, ClusterEvent::Update(_, _))
    }
}

/// Receives cluster events from the source cache and decides when to
/// schedule a DAG rebuild.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: ClusterEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::{Protocol, Service, ServicePort};

    fn service(rv: &str) -> Service {
        Service {
            key: ObjectKey::new("default", "web"),
            resource_version: rv.to_string(),
            ports: vec![ServicePort { number: 80, name: None, protocol: Protocol::Tcp }],
        }
    }

    #[test]
    fn add_event_key_matches_object() {
        let event = ClusterEvent::Add(ClusterObject::Service(service("1")));
        assert_eq!(event.key(), &ObjectKey::new("default", "web"));
        assert!(!event.is_update());
    }

    #[test]
    fn update_event_key_is_the_new_object() {
        let event = ClusterEvent::Update(
            ClusterObject::Service(service("1")),
            ClusterObject::Service(service("2")),
        );
        assert!(event.is_update());
    }
}
