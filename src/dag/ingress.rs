//! Legacy Ingress processing.
//!
//! Each `Ingress` is self-contained: its rules are translated directly into
//! routes on one virtual host per distinct host, with no cross-object
//! delegation to worry about.

use std::collections::{BTreeMap, BTreeSet};

use crate::cache::SourceCache;
use crate::dag::ordering::sort_routes;
use crate::dag::status::StatusBook;
use crate::dag::types::{
    Cluster, Redirect, RetryPolicy, Route, Secret, SecureVirtualHost, TimeoutPolicy, VirtualHost,
};
use crate::domain::httpproxy::{PathCondition, PathMatchKind};
use crate::domain::ingress::{Ingress, IngressBackend};
use crate::utils::naming;

const DEFAULT_MIN_TLS_VERSION: &str = "1.2";

/// Characters that mark an Ingress path as a regular expression rather than
/// a literal prefix.
const REGEX_METACHARACTERS: &[char] =
    &['^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}', '\\'];

fn classify_path(raw: &str) -> PathCondition {
    if raw.is_empty() {
        return PathCondition { kind: PathMatchKind::Prefix, value: "/".to_string() };
    }
    let kind = if raw.chars().any(|c| REGEX_METACHARACTERS.contains(&c)) {
        PathMatchKind::Regex
    } else {
        PathMatchKind::Prefix
    };
    PathCondition { kind, value: raw.to_string() }
}

/// A catch-all route that redirects to HTTPS instead of routing to a
/// cluster, used on the plaintext listener for hosts where
/// `force_ssl_redirect` is set and TLS is configured.
fn https_redirect_route() -> Route {
    Route { redirect: Some(Redirect { https_redirect: true }), ..Route::default() }
}

pub struct IngressOutput {
    pub virtual_hosts: Vec<VirtualHost>,
    pub secure_virtual_hosts: Vec<SecureVirtualHost>,
}

pub fn process_ingresses(cache: &SourceCache, status: &mut StatusBook) -> IngressOutput {
    let mut by_host: BTreeMap<String, Vec<Route>> = BTreeMap::new();
    let mut secure: Vec<SecureVirtualHost> = Vec::new();
    let mut redirect_hosts: BTreeSet<String> = BTreeSet::new();

    for ingress in cache.ingresses.iter() {
        let mut ingress_valid = true;

        let tls_hosts: BTreeMap<&str, &str> = ingress
            .tls
            .iter()
            .flat_map(|t| t.hosts.iter().map(move |h| (h.as_str(), t.secret_name.as_str())))
            .collect();
        let force_ssl_redirect = ingress.force_ssl_redirect();

        for rule in &ingress.rules {
            let host = rule.host.clone().unwrap_or_else(|| "*".to_string());
            if force_ssl_redirect && tls_hosts.contains_key(host.as_str()) {
                redirect_hosts.insert(host.clone());
            }
            for path in &rule.paths {
                let Some(route) = build_route(cache, &ingress, &path.backend, path.path.as_deref())
                else {
                    ingress_valid = false;
                    continue;
                };
                by_host.entry(host.clone()).or_default().push(route);
            }
        }

        if let Some(backend) = &ingress.default_backend {
            if force_ssl_redirect && tls_hosts.contains_key("*") {
                redirect_hosts.insert("*".to_string());
            }
            if let Some(route) = build_route(cache, &ingress, backend, None) {
                by_host.entry("*".to_string()).or_default().push(route);
            } else {
                ingress_valid = false;
            }
        }

        if ingress_valid {
            status.valid(ingress.key.clone());
        } else {
            status.invalid(ingress.key.clone(), "one or more backends could not be resolved");
        }

        for (host, secret_name) in &tls_hosts {
            let Some(routes) = by_host.get(*host).cloned() else { continue };
            let Some(secret_obj) = cache.secrets.get(&crate::domain::ObjectKey::new(
                ingress.key.namespace.clone(),
                (*secret_name).to_string(),
            )) else {
                continue;
            };
            let crate::domain::secret::SecretData::Tls { certificate_chain, private_key } =
                &secret_obj.data
            else {
                continue;
            };
            let min_tls = ingress.minimum_tls_version().unwrap_or(DEFAULT_MIN_TLS_VERSION).to_string();
            secure.push(SecureVirtualHost {
                virtualhost: VirtualHost { fqdn: host.to_string(), routes },
                secret: Secret {
                    name: naming::secret_name(&secret_obj.key.namespace, &secret_obj.key.name, certificate_chain),
                    certificate_chain: certificate_chain.clone(),
                    private_key: private_key.clone(),
                },
                minimum_tls_version: min_tls,
                maximum_tls_version: None,
            });
        }
    }

    let mut virtual_hosts: Vec<VirtualHost> = by_host
        .into_iter()
        .map(|(fqdn, mut routes)| {
            if redirect_hosts.contains(&fqdn) {
                return VirtualHost { fqdn, routes: vec![https_redirect_route()] };
            }
            sort_routes(&mut routes);
            VirtualHost { fqdn, routes }
        })
        .collect();
    virtual_hosts.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));

    IngressOutput { virtual_hosts, secure_virtual_hosts: secure }
}

fn build_route(
    cache: &SourceCache,
    ingress: &Ingress,
    backend: &IngressBackend,
    path: Option<&str>,
) -> Option<Route> {
    let service_key = crate::domain::ObjectKey::new(ingress.key.namespace.clone(), backend.service_name.clone());
    let service = cache.services.get(&service_key)?;
    let port = service.port(&backend.service_port)?;

    let cluster_name = naming::cluster_name(&ingress.key.namespace, &backend.service_name, &port.number.to_string());

    let clusters = vec![Cluster {
        name: cluster_name,
        service: service_key,
        port_id: port.number.to_string(),
        weight: 1,
    }];

    Some(Route {
        path: path.map(classify_path),
        headers: vec![],
        clusters,
        enable_websockets: !ingress.websocket_routes().is_empty(),
        timeout_policy: TimeoutPolicy {
            response_timeout: ingress.response_timeout().map(str::to_string),
            idle_timeout: None,
        },
        retry_policy: RetryPolicy {
            num_retries: ingress.num_retries().and_then(|v| v.parse().ok()),
            retry_on: ingress.retry_on().map(str::to_string),
        },
        redirect: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ingress::{IngressRule, IngressStatus, IngressTls};
    use crate::domain::secret::SecretData;
    use crate::domain::service::{Protocol, Service, ServicePort};
    use crate::domain::{ClusterObject, ObjectKey, Secret as SourceSecret};
    use std::collections::HashMap;

    fn service(name: &str, port: u16) -> Service {
        Service {
            key: ObjectKey::new("default", name),
            resource_version: "1".into(),
            ports: vec![ServicePort { number: port, name: None, protocol: Protocol::Tcp }],
        }
    }

    fn ingress(annotations: HashMap<String, String>, rules: Vec<IngressRule>, tls: Vec<IngressTls>) -> Ingress {
        Ingress {
            key: ObjectKey::new("default", "site"),
            resource_version: "1".into(),
            ingress_class_name: None,
            annotations,
            default_backend: None,
            rules,
            tls,
            status: IngressStatus::default(),
        }
    }

    #[test]
    fn empty_path_normalizes_to_prefix_slash() {
        let cond = classify_path("");
        assert_eq!(cond.kind, PathMatchKind::Prefix);
        assert_eq!(cond.value, "/");
    }

    #[test]
    fn plain_path_is_a_prefix_match() {
        let cond = classify_path("/foo/bar");
        assert_eq!(cond.kind, PathMatchKind::Prefix);
    }

    #[test]
    fn path_with_regex_metacharacters_is_a_regex_match() {
        let cond = classify_path("/foo.*");
        assert_eq!(cond.kind, PathMatchKind::Regex);
        assert_eq!(cond.value, "/foo.*");
    }

    #[test]
    fn force_ssl_redirect_emits_a_redirect_only_route_on_the_http_listener() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("backend", 80)));
        cache.upsert(ClusterObject::Secret(SourceSecret {
            key: ObjectKey::new("default", "site-tls"),
            resource_version: "1".into(),
            data: SecretData::Tls { certificate_chain: b"chain".to_vec(), private_key: b"key".to_vec() },
        }));

        let rule = IngressRule {
            host: Some("example.com".to_string()),
            paths: vec![crate::domain::ingress::IngressPath {
                path: Some("/".to_string()),
                backend: IngressBackend { service_name: "backend".to_string(), service_port: "80".to_string() },
            }],
        };
        let tls = vec![IngressTls { hosts: vec!["example.com".to_string()], secret_name: "site-tls".to_string() }];
        let annotations =
            HashMap::from([("ingress.kubernetes.io/force-ssl-redirect".to_string(), "true".to_string())]);

        let mut status = StatusBook::new();
        cache.upsert(ClusterObject::Ingress(ingress(annotations, vec![rule], tls)));
        let output = process_ingresses(&cache, &mut status);

        assert_eq!(output.virtual_hosts.len(), 1);
        let http_routes = &output.virtual_hosts[0].routes;
        assert_eq!(http_routes.len(), 1);
        assert!(http_routes[0].clusters.is_empty());
        assert_eq!(http_routes[0].redirect, Some(Redirect { https_redirect: true }));

        assert_eq!(output.secure_virtual_hosts.len(), 1);
        assert!(!output.secure_virtual_hosts[0].virtualhost.routes[0].clusters.is_empty());
    }
}
