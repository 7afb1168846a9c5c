//! Native `HTTPProxy` processing.
//!
//! Root proxies (those carrying a `virtualhost`) claim a single fqdn.
//! Conflicting roots — two proxies claiming the same fqdn — invalidate
//! every contender but the one that sorts first by namespace/name, which
//! keeps the outcome deterministic across rebuilds rather than picking
//! whichever happened to be processed first. Includes are resolved
//! depth-first with a visited set guarding against delegation cycles.

use std::collections::{BTreeMap, HashSet};

use crate::cache::SourceCache;
use crate::dag::ordering::sort_routes;
use crate::dag::status::StatusBook;
use crate::dag::types::{
    Cluster, RetryPolicy, Route as DagRoute, Secret, SecureVirtualHost, TimeoutPolicy, VirtualHost,
};
use crate::domain::httpproxy::{HttpProxy, Include, Route as ProxyRoute};
use crate::domain::secret::SecretData;
use crate::domain::{ObjectKey, Secret as SourceSecret};
use crate::utils::naming;

pub struct HttpProxyOutput {
    pub virtual_hosts: Vec<VirtualHost>,
    pub secure_virtual_hosts: Vec<SecureVirtualHost>,
}

pub fn process_httpproxies(cache: &SourceCache, status: &mut StatusBook) -> HttpProxyOutput {
    let all = cache.httpproxies.iter();

    let mut by_fqdn: BTreeMap<String, Vec<&HttpProxy>> = BTreeMap::new();
    for proxy in &all {
        if let Some(vhost) = &proxy.virtualhost {
            by_fqdn.entry(vhost.fqdn.clone()).or_default().push(proxy);
        }
    }

    let mut winners: Vec<&HttpProxy> = Vec::new();
    for (_fqdn, mut contenders) in by_fqdn {
        contenders.sort_by(|a, b| (&a.key.namespace, &a.key.name).cmp(&(&b.key.namespace, &b.key.name)));
        let (winner, rest) = contenders.split_first().unwrap();
        winners.push(winner);
        for loser in rest {
            status.invalid(loser.key.clone(), "fqdn already claimed by another HTTPProxy");
        }
    }

    let mut virtual_hosts = Vec::new();
    let mut secure = Vec::new();
    let mut visited_roots = HashSet::new();

    for root in &winners {
        if !visited_roots.insert(root.key.clone()) {
            continue;
        }
        let vhost = root.virtualhost.as_ref().unwrap();
        let mut seen = HashSet::new();
        seen.insert(root.key.clone());
        let routes = resolve_routes(cache, root, &mut seen, status);
        status.valid(root.key.clone());

        let mut sorted_routes = routes.clone();
        sort_routes(&mut sorted_routes);

        if let Some(tls) = &vhost.tls {
            match resolve_delegated_secret(cache, &root.key.namespace, &tls.secret_name) {
                Ok(Some(secret_obj)) => {
                    if let SecretData::Tls { certificate_chain, private_key } = &secret_obj.data {
                        secure.push(SecureVirtualHost {
                            virtualhost: VirtualHost { fqdn: vhost.fqdn.clone(), routes: sorted_routes.clone() },
                            secret: Secret {
                                name: naming::secret_name(&secret_obj.key.namespace, &secret_obj.key.name, certificate_chain),
                                certificate_chain: certificate_chain.clone(),
                                private_key: private_key.clone(),
                            },
                            minimum_tls_version: tls.minimum_protocol_version.clone().unwrap_or_else(|| "1.2".to_string()),
                            maximum_tls_version: tls.maximum_protocol_version.clone(),
                        });
                        continue;
                    }
                }
                Ok(None) => {}
                Err(reason) => {
                    status.invalid(root.key.clone(), reason);
                    continue;
                }
            }
        }

        virtual_hosts.push(VirtualHost { fqdn: vhost.fqdn.clone(), routes: sorted_routes });
    }

    status.mark_remaining_orphaned(all.iter().map(|p| p.key.clone()));

    virtual_hosts.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));
    HttpProxyOutput { virtual_hosts, secure_virtual_hosts: secure }
}

fn resolve_routes(
    cache: &SourceCache,
    proxy: &HttpProxy,
    seen: &mut HashSet<ObjectKey>,
    status: &mut StatusBook,
) -> Vec<DagRoute> {
    let mut routes = Vec::new();

    for route in &proxy.routes {
        if let Some(dag_route) = build_route(cache, proxy, route) {
            routes.push(dag_route);
        }
    }

    for include in &proxy.includes {
        routes.extend(resolve_include(cache, proxy, include, seen, status));
    }

    routes
}

fn resolve_include(
    cache: &SourceCache,
    parent: &HttpProxy,
    include: &Include,
    seen: &mut HashSet<ObjectKey>,
    status: &mut StatusBook,
) -> Vec<DagRoute> {
    let namespace = include.namespace.clone().unwrap_or_else(|| parent.key.namespace.clone());
    let key = ObjectKey::new(namespace, include.name.clone());

    if seen.contains(&key) {
        status.invalid(parent.key.clone(), format!("include cycle detected at {key}"));
        return Vec::new();
    }

    let Some(child) = cache.httpproxies.get(&key) else {
        status.invalid(parent.key.clone(), format!("included HTTPProxy {key} not found"));
        return Vec::new();
    };

    seen.insert(key.clone());
    let child_routes = resolve_routes(cache, &child, seen, status);
    seen.remove(&key);

    child_routes
        .into_iter()
        .map(|mut r| {
            if r.path.is_none() {
                r.path = include.condition.path.clone();
            }
            let mut headers = include.condition.headers.clone();
            headers.extend(r.headers);
            r.headers = headers;
            r
        })
        .collect()
}

/// Resolve a vhost's `secret_name` to the secret it names, honoring
/// cross-namespace references of the form `namespace/name`. A reference into
/// another namespace is only honored when that namespace carries a
/// `TlsCertificateDelegation` permitting `proxy_namespace` (via an exact
/// `target_namespaces` entry or `"*"`). Returns `Err` with an invalidation
/// reason when the secret exists but isn't delegated.
fn resolve_delegated_secret(
    cache: &SourceCache,
    proxy_namespace: &str,
    secret_name_field: &str,
) -> Result<Option<SourceSecret>, String> {
    let (secret_namespace, secret_name) = match secret_name_field.split_once('/') {
        Some((ns, name)) => (ns.to_string(), name.to_string()),
        None => (proxy_namespace.to_string(), secret_name_field.to_string()),
    };

    let Some(secret_obj) = cache.secrets.get(&ObjectKey::new(secret_namespace.clone(), secret_name.clone())) else {
        return Ok(None);
    };

    if secret_namespace == proxy_namespace {
        return Ok(Some(secret_obj));
    }

    let permitted = cache.delegations.iter().any(|delegation| {
        delegation.key.namespace == secret_namespace
            && delegation
                .delegations
                .iter()
                .any(|d| d.secret_name == secret_name && d.permits(proxy_namespace))
    });

    if permitted {
        Ok(Some(secret_obj))
    } else {
        Err(format!(
            "secret {secret_namespace}/{secret_name} is not delegated to namespace {proxy_namespace}"
        ))
    }
}

fn build_route(cache: &SourceCache, proxy: &HttpProxy, route: &ProxyRoute) -> Option<DagRoute> {
    // Weights default to 1 only when every service on the route leaves
    // weight unset. If any service carries an explicit weight, the rest
    // stay at 0 rather than being bumped up to compete with it.
    let all_unweighted = route.services.iter().all(|svc| svc.weight == 0);

    let mut clusters = Vec::new();
    for svc in &route.services {
        let service_key = ObjectKey::new(proxy.key.namespace.clone(), svc.name.clone());
        let Some(service) = cache.services.get(&service_key) else { continue };
        let Some(port) = service.port(&svc.port) else { continue };
        clusters.push(Cluster {
            name: naming::cluster_name(&proxy.key.namespace, &svc.name, &port.number.to_string()),
            service: service_key,
            port_id: port.number.to_string(),
            weight: if all_unweighted { 1 } else { svc.weight },
        });
    }

    if clusters.is_empty() {
        return None;
    }

    Some(DagRoute {
        path: route.conditions.path.clone(),
        headers: route.conditions.headers.clone(),
        clusters,
        enable_websockets: route.enable_websockets,
        timeout_policy: TimeoutPolicy {
            response_timeout: route.timeout_policy.response_timeout.clone(),
            idle_timeout: route.timeout_policy.idle_timeout.clone(),
        },
        retry_policy: RetryPolicy {
            num_retries: route.retry_policy.num_retries,
            retry_on: route.retry_policy.retry_on.clone(),
        },
        redirect: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::status::StatusBook;
    use crate::domain::httpproxy::{
        HttpProxyStatus, Route as ProxyRoute, RouteConditions, RouteRetryPolicy, RouteTimeoutPolicy,
        VirtualHost as ProxyVirtualHost, WeightedService,
    };
    use crate::domain::service::{Protocol, Service, ServicePort};
    use crate::domain::ClusterObject;
    use crate::domain::ObjectKey;

    fn service(name: &str, port: u16) -> Service {
        Service {
            key: ObjectKey::new("default", name),
            resource_version: "1".into(),
            ports: vec![ServicePort { number: port, name: None, protocol: Protocol::Tcp }],
        }
    }

    fn root_proxy(name: &str, fqdn: &str, services: Vec<WeightedService>) -> HttpProxy {
        HttpProxy {
            key: ObjectKey::new("default", name),
            resource_version: "1".into(),
            virtualhost: Some(ProxyVirtualHost { fqdn: fqdn.to_string(), tls: None }),
            routes: vec![ProxyRoute {
                conditions: RouteConditions::default(),
                services,
                timeout_policy: RouteTimeoutPolicy::default(),
                retry_policy: RouteRetryPolicy::default(),
                enable_websockets: false,
                permit_insecure: false,
            }],
            includes: vec![],
            status: HttpProxyStatus::default(),
        }
    }

    #[test]
    fn weighted_native_routing_splits_across_services() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("blue", 80)));
        cache.upsert(ClusterObject::Service(service("green", 80)));
        cache.upsert(ClusterObject::HttpProxy(root_proxy(
            "www",
            "example.com",
            vec![
                WeightedService { name: "blue".into(), port: "80".into(), weight: 80 },
                WeightedService { name: "green".into(), port: "80".into(), weight: 20 },
            ],
        )));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        assert_eq!(output.virtual_hosts.len(), 1);
        let clusters = &output.virtual_hosts[0].routes[0].clusters;
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.iter().map(|c| c.weight).sum::<u32>(), 100);
    }

    #[test]
    fn unweighted_services_split_evenly_when_none_carry_a_weight() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("blue", 80)));
        cache.upsert(ClusterObject::Service(service("green", 80)));
        cache.upsert(ClusterObject::HttpProxy(root_proxy(
            "www",
            "example.com",
            vec![
                WeightedService { name: "blue".into(), port: "80".into(), weight: 0 },
                WeightedService { name: "green".into(), port: "80".into(), weight: 0 },
            ],
        )));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        let clusters = &output.virtual_hosts[0].routes[0].clusters;
        assert_eq!(clusters.iter().map(|c| c.weight).collect::<Vec<_>>(), vec![1, 1]);
    }

    #[test]
    fn an_explicit_weight_on_one_service_leaves_the_other_at_zero() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("backend", 80)));
        cache.upsert(ClusterObject::Service(service("backendtwo", 80)));
        cache.upsert(ClusterObject::HttpProxy(root_proxy(
            "www",
            "example.com",
            vec![
                WeightedService { name: "backend".into(), port: "80".into(), weight: 0 },
                WeightedService { name: "backendtwo".into(), port: "80".into(), weight: 50 },
            ],
        )));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        let clusters = &output.virtual_hosts[0].routes[0].clusters;
        let weights: Vec<u32> = clusters.iter().map(|c| c.weight).collect();
        assert_eq!(weights, vec![0, 50]);
        assert_eq!(weights.iter().sum::<u32>(), 50);
    }

    #[test]
    fn delegated_secret_in_another_namespace_is_honored() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("web", 80)));
        cache.upsert(ClusterObject::Secret(crate::domain::Secret {
            key: ObjectKey::new("cert-ns", "shared-cert"),
            resource_version: "1".into(),
            data: SecretData::Tls { certificate_chain: b"chain".to_vec(), private_key: b"key".to_vec() },
        }));
        cache.upsert(ClusterObject::TlsCertificateDelegation(crate::domain::TlsCertificateDelegation {
            key: ObjectKey::new("cert-ns", "delegation"),
            resource_version: "1".into(),
            delegations: vec![crate::domain::delegation::Delegation {
                secret_name: "shared-cert".into(),
                target_namespaces: vec!["default".into()],
            }],
        }));

        let mut proxy = root_proxy("www", "example.com", vec![WeightedService { name: "web".into(), port: "80".into(), weight: 1 }]);
        proxy.virtualhost = Some(ProxyVirtualHost {
            fqdn: "example.com".into(),
            tls: Some(crate::domain::httpproxy::VirtualHostTls {
                secret_name: "cert-ns/shared-cert".into(),
                minimum_protocol_version: None,
                maximum_protocol_version: None,
                fallback: false,
                client_validation: None,
            }),
        });
        cache.upsert(ClusterObject::HttpProxy(proxy));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        assert_eq!(output.secure_virtual_hosts.len(), 1);
        assert!(output.virtual_hosts.is_empty());
    }

    #[test]
    fn secret_reference_without_a_matching_delegation_invalidates_the_proxy() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("web", 80)));
        cache.upsert(ClusterObject::Secret(crate::domain::Secret {
            key: ObjectKey::new("cert-ns", "shared-cert"),
            resource_version: "1".into(),
            data: SecretData::Tls { certificate_chain: b"chain".to_vec(), private_key: b"key".to_vec() },
        }));

        let mut proxy = root_proxy("www", "example.com", vec![WeightedService { name: "web".into(), port: "80".into(), weight: 1 }]);
        proxy.virtualhost = Some(ProxyVirtualHost {
            fqdn: "example.com".into(),
            tls: Some(crate::domain::httpproxy::VirtualHostTls {
                secret_name: "cert-ns/shared-cert".into(),
                minimum_protocol_version: None,
                maximum_protocol_version: None,
                fallback: false,
                client_validation: None,
            }),
        });
        cache.upsert(ClusterObject::HttpProxy(proxy));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        assert!(output.secure_virtual_hosts.is_empty());
        assert!(output.virtual_hosts.is_empty());
        let entries: std::collections::HashMap<_, _> = status.into_vec().into_iter().collect();
        assert!(matches!(
            entries[&ObjectKey::new("default", "www")],
            crate::dag::types::Status::Invalid(_)
        ));
    }

    #[test]
    fn conflicting_roots_keep_the_lexicographically_first_and_invalidate_the_rest() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(service("web", 80)));
        cache.upsert(ClusterObject::HttpProxy(root_proxy(
            "b-proxy",
            "shared.example.com",
            vec![WeightedService { name: "web".into(), port: "80".into(), weight: 1 }],
        )));
        cache.upsert(ClusterObject::HttpProxy(root_proxy(
            "a-proxy",
            "shared.example.com",
            vec![WeightedService { name: "web".into(), port: "80".into(), weight: 1 }],
        )));

        let mut status = StatusBook::new();
        let output = process_httpproxies(&cache, &mut status);
        assert_eq!(output.virtual_hosts.len(), 1);

        let entries: std::collections::HashMap<_, _> = status.into_vec().into_iter().collect();
        assert_eq!(entries[&ObjectKey::new("default", "a-proxy")], crate::dag::types::Status::Valid);
        assert!(matches!(
            entries[&ObjectKey::new("default", "b-proxy")],
            crate::dag::types::Status::Invalid(_)
        ));
    }
}
