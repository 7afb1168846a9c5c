use serde::{Deserialize, Serialize};

use super::ObjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientAuthPolicy {
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHostTls {
    pub secret_name: String,
    pub minimum_protocol_version: Option<String>,
    pub maximum_protocol_version: Option<String>,
    /// Secret to serve when no SNI match is found at the listener.
    pub fallback: bool,
    pub client_validation: Option<ClientAuthPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub fqdn: String,
    pub tls: Option<VirtualHostTls>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMatchKind {
    Prefix,
    Exact,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCondition {
    pub kind: PathMatchKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderMatchKind {
    Exact,
    Present,
    Contains,
    NotContains,
    NotExact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCondition {
    pub name: String,
    pub kind: HeaderMatchKind,
    pub value: Option<String>,
}

/// Per-route match conditions. A route matches when its path condition (if
/// any) and every header condition are all satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteConditions {
    pub path: Option<PathCondition>,
    pub headers: Vec<HeaderCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedService {
    pub name: String,
    pub port: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteTimeoutPolicy {
    pub response_timeout: Option<String>,
    pub idle_timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteRetryPolicy {
    pub num_retries: Option<u32>,
    pub retry_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub conditions: RouteConditions,
    pub services: Vec<WeightedService>,
    pub timeout_policy: RouteTimeoutPolicy,
    pub retry_policy: RouteRetryPolicy,
    pub enable_websockets: bool,
    pub permit_insecure: bool,
}

/// A reference to another `HttpProxy` in the same or a different namespace,
/// carrying a subset of the path space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub name: String,
    pub namespace: Option<String>,
    pub condition: RouteConditions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HttpProxyStatus {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Native `HTTPProxy` source object: an optional virtual host (root proxy)
/// or an orphan route set intended to be included by another proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProxy {
    pub key: ObjectKey,
    pub resource_version: String,
    pub virtualhost: Option<VirtualHost>,
    pub routes: Vec<Route>,
    pub includes: Vec<Include>,
    pub status: HttpProxyStatus,
}

impl PartialEq for HttpProxy {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.virtualhost == other.virtualhost
            && self.routes == other.routes
            && self.includes == other.includes
    }
}

impl HttpProxy {
    pub fn is_root(&self) -> bool {
        self.virtualhost.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_proxy_requires_virtualhost() {
        let proxy = HttpProxy {
            key: ObjectKey::new("default", "www"),
            resource_version: "1".into(),
            virtualhost: Some(VirtualHost { fqdn: "example.com".into(), tls: None }),
            routes: vec![],
            includes: vec![],
            status: HttpProxyStatus::default(),
        };
        assert!(proxy.is_root());
    }

    #[test]
    fn status_changes_do_not_affect_equality() {
        let mut a = HttpProxy {
            key: ObjectKey::new("default", "www"),
            resource_version: "1".into(),
            virtualhost: None,
            routes: vec![],
            includes: vec![],
            status: HttpProxyStatus { valid: false, reason: None },
        };
        let mut b = a.clone();
        b.status = HttpProxyStatus { valid: true, reason: Some("ok".into()) };
        assert_eq!(a, b);
        a.resource_version = "2".into();
        assert_eq!(a, b);
    }
}
