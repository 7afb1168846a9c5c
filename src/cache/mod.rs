//! Source cache.
//!
//! The only store of truth for cluster objects observed from the upstream
//! source. Each kind lives in its own `DashMap` keyed by [`ObjectKey`].
//! `insert`/`remove` compare against the previous value using the object's
//! own `PartialEq` (which already ignores `resourceVersion`/`status`
//! churn) and report whether anything the DAG builder cares about actually
//! changed.

use dashmap::DashMap;

use crate::domain::{
    ClusterEvent, ClusterObject, Endpoints, HttpProxy, Ingress, ObjectKey, Secret, Service,
    TlsCertificateDelegation,
};

macro_rules! object_store {
    ($name:ident, $ty:ty) => {
        #[derive(Default)]
        pub struct $name(DashMap<ObjectKey, $ty>);

        impl $name {
            fn new() -> Self {
                Self(DashMap::new())
            }

            pub fn get(&self, key: &ObjectKey) -> Option<$ty> {
                self.0.get(key).map(|entry| entry.clone())
            }

            pub fn iter(&self) -> Vec<$ty> {
                self.0.iter().map(|entry| entry.value().clone()).collect()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }
    };
}

object_store!(ServiceStore, Service);
object_store!(EndpointsStore, Endpoints);
object_store!(IngressStore, Ingress);
object_store!(HttpProxyStore, HttpProxy);
object_store!(SecretStore, Secret);
object_store!(DelegationStore, TlsCertificateDelegation);

/// All known cluster objects, grouped by kind.
#[derive(Default)]
pub struct SourceCache {
    pub services: ServiceStore,
    pub endpoints: EndpointsStore,
    pub ingresses: IngressStore,
    pub httpproxies: HttpProxyStore,
    pub secrets: SecretStore,
    pub delegations: DelegationStore,
}

/// Load a static fixture — a YAML list of [`ClusterObject`] — into a fresh
/// cache. Used in place of a live Kubernetes informer, which is out of
/// scope for this crate.
pub fn load_fixture(yaml: &str) -> crate::errors::Result<SourceCache> {
    let objects: Vec<ClusterObject> = serde_yaml::from_str(yaml)?;
    let cache = SourceCache::new();
    for object in objects {
        cache.upsert(object);
    }
    Ok(cache)
}

impl SourceCache {
    pub fn new() -> Self {
        Self {
            services: ServiceStore::new(),
            endpoints: EndpointsStore::new(),
            ingresses: IngressStore::new(),
            httpproxies: HttpProxyStore::new(),
            secrets: SecretStore::new(),
            delegations: DelegationStore::new(),
        }
    }

    /// Insert or replace an object, returning the event to publish if
    /// anything meaningful changed. Returns `None` when the new value is
    /// equal to the previous one (status/resourceVersion-only churn).
    pub fn upsert(&self, object: ClusterObject) -> Option<ClusterEvent> {
        match object {
            ClusterObject::Service(obj) => {
                Self::upsert_into(&self.services.0, obj, ClusterObject::Service)
            }
            ClusterObject::Endpoints(obj) => {
                Self::upsert_into(&self.endpoints.0, obj, ClusterObject::Endpoints)
            }
            ClusterObject::Ingress(obj) => {
                Self::upsert_into(&self.ingresses.0, obj, ClusterObject::Ingress)
            }
            ClusterObject::HttpProxy(obj) => {
                Self::upsert_into(&self.httpproxies.0, obj, ClusterObject::HttpProxy)
            }
            ClusterObject::Secret(obj) => {
                Self::upsert_into(&self.secrets.0, obj, ClusterObject::Secret)
            }
            ClusterObject::TlsCertificateDelegation(obj) => {
                Self::upsert_into(&self.delegations.0, obj, ClusterObject::TlsCertificateDelegation)
            }
        }
    }

    fn upsert_into<T: Clone + PartialEq + HasKey>(
        map: &DashMap<ObjectKey, T>,
        obj: T,
        wrap: impl Fn(T) -> ClusterObject,
    ) -> Option<ClusterEvent> {
        let key = obj.object_key().clone();
        match map.insert(key.clone(), obj.clone()) {
            None => Some(ClusterEvent::Add(wrap(obj))),
            Some(previous) if previous == obj => None,
            Some(previous) => Some(ClusterEvent::Update(wrap(previous), wrap(obj))),
        }
    }

    /// Remove an object by kind and key. Returns the delete event if it was
    /// present.
    pub fn remove(&self, kind: ObjectKind, key: &ObjectKey) -> Option<ClusterEvent> {
        match kind {
            ObjectKind::Service => {
                self.services.0.remove(key).map(|(_, v)| ClusterEvent::Delete(ClusterObject::Service(v)))
            }
            ObjectKind::Endpoints => self
                .endpoints
                .0
                .remove(key)
                .map(|(_, v)| ClusterEvent::Delete(ClusterObject::Endpoints(v))),
            ObjectKind::Ingress => {
                self.ingresses.0.remove(key).map(|(_, v)| ClusterEvent::Delete(ClusterObject::Ingress(v)))
            }
            ObjectKind::HttpProxy => self
                .httpproxies
                .0
                .remove(key)
                .map(|(_, v)| ClusterEvent::Delete(ClusterObject::HttpProxy(v))),
            ObjectKind::Secret => {
                self.secrets.0.remove(key).map(|(_, v)| ClusterEvent::Delete(ClusterObject::Secret(v)))
            }
            ObjectKind::TlsCertificateDelegation => self
                .delegations
                .0
                .remove(key)
                .map(|(_, v)| ClusterEvent::Delete(ClusterObject::TlsCertificateDelegation(v))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Service,
    Endpoints,
    Ingress,
    HttpProxy,
    Secret,
    TlsCertificateDelegation,
}

trait HasKey {
    fn object_key(&self) -> &ObjectKey;
}

impl HasKey for Service {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
impl HasKey for Endpoints {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
impl HasKey for Ingress {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
impl HasKey for HttpProxy {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
impl HasKey for Secret {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
impl HasKey for TlsCertificateDelegation {
    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::{Protocol, ServicePort};

    fn service(rv: &str, port: u16) -> Service {
        Service {
            key: ObjectKey::new("default", "web"),
            resource_version: rv.to_string(),
            ports: vec![ServicePort { number: port, name: None, protocol: Protocol::Tcp }],
        }
    }

    #[test]
    fn first_insert_is_an_add() {
        let cache = SourceCache::new();
        let event = cache.upsert(ClusterObject::Service(service("1", 80)));
        assert!(matches!(event, Some(ClusterEvent::Add(_))));
    }

    #[test]
    fn resource_version_only_change_is_suppressed() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("1", 80)));
        let event = cache.upsert(ClusterObject::Service(service("2", 80)));
        assert_eq!(event, None);
    }

    #[test]
    fn port_change_is_an_update() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("1", 80)));
        let event = cache.upsert(ClusterObject::Service(service("2", 81)));
        assert!(matches!(event, Some(ClusterEvent::Update(_, _))));
    }

    #[test]
    fn remove_missing_object_is_none() {
        let cache = SourceCache::new();
        assert_eq!(cache.remove(ObjectKind::Service, &ObjectKey::new("default", "ghost")), None);
    }

    #[test]
    fn remove_present_object_emits_delete() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("1", 80)));
        let event = cache.remove(ObjectKind::Service, &ObjectKey::new("default", "web"));
        assert!(matches!(event, Some(ClusterEvent::Delete(_))));
    }
}
