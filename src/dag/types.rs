//! DAG node types.
//!
//! The DAG is rebuilt from scratch on every rebuild cycle and handed to the
//! translator as an immutable snapshot — nothing here is mutated in place
//! once [`crate::dag::build`] returns.

use crate::domain::ObjectKey;
use crate::domain::httpproxy::{HeaderCondition, PathCondition};

/// Validation outcome recorded against a source object during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Valid,
    Invalid(String),
    /// Referenced by nothing reachable from a root virtual host.
    Orphaned,
}

impl Status {
    pub fn is_valid(&self) -> bool {
        matches!(self, Status::Valid)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub service: ObjectKey,
    pub port_id: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeoutPolicy {
    pub response_timeout: Option<String>,
    pub idle_timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetryPolicy {
    pub num_retries: Option<u32>,
    pub retry_on: Option<String>,
}

/// A redirect action, taking the place of a cluster route entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Redirect {
    pub https_redirect: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub path: Option<PathCondition>,
    pub headers: Vec<HeaderCondition>,
    pub clusters: Vec<Cluster>,
    pub enable_websockets: bool,
    pub timeout_policy: TimeoutPolicy,
    pub retry_policy: RetryPolicy,
    /// When set, this route redirects instead of routing to `clusters`.
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Secret {
    pub name: String,
    pub certificate_chain: Vec<u8>,
    pub private_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualHost {
    pub fqdn: String,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecureVirtualHost {
    pub virtualhost: VirtualHost,
    pub secret: Secret,
    pub minimum_tls_version: String,
    pub maximum_tls_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerProtocol {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub name: String,
    pub protocol: ListenerProtocol,
    pub address: String,
    pub port: u16,
    pub virtual_hosts: Vec<VirtualHost>,
    pub secure_virtual_hosts: Vec<SecureVirtualHost>,
}

/// Immutable snapshot produced by a single build cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dag {
    pub listeners: Vec<Listener>,
    pub statuses: Vec<(ObjectKey, Status)>,
}

impl Dag {
    pub fn status_for(&self, key: &ObjectKey) -> Option<&Status> {
        self.statuses.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn all_clusters(&self) -> Vec<&Cluster> {
        let mut out = Vec::new();
        for listener in &self.listeners {
            for vh in &listener.virtual_hosts {
                for route in &vh.routes {
                    out.extend(route.clusters.iter());
                }
            }
            for svh in &listener.secure_virtual_hosts {
                for route in &svh.virtualhost.routes {
                    out.extend(route.clusters.iter());
                }
            }
        }
        out
    }

    pub fn all_secrets(&self) -> Vec<&Secret> {
        self.listeners
            .iter()
            .flat_map(|l| l.secure_virtual_hosts.iter().map(|svh| &svh.secret))
            .collect()
    }
}
