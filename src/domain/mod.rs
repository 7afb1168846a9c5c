//! Source object model.
//!
//! These are the cluster objects the upstream source delivers: [`Service`],
//! [`Endpoints`], [`Ingress`], [`HttpProxy`], [`Secret`] and
//! [`TlsCertificateDelegation`]. They are plain data — nothing here computes
//! the DAG, it only describes what was observed.

pub mod delegation;
pub mod endpoints;
pub mod event;
pub mod httpproxy;
pub mod ingress;
pub mod secret;
pub mod service;

pub use delegation::TlsCertificateDelegation;
pub use endpoints::Endpoints;
pub use event::{ClusterEvent, ClusterObject};
pub use httpproxy::HttpProxy;
pub use ingress::Ingress;
pub use secret::Secret;
pub use service::Service;

/// Identity of a namespaced cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
