use crate::cache::SourceCache;
use crate::config::DagConfig;
use crate::dag::httpproxy::process_httpproxies;
use crate::dag::ingress::process_ingresses;
use crate::dag::status::StatusBook;
use crate::dag::types::{Dag, Listener, ListenerProtocol};

/// Build a fresh [`Dag`] from the current contents of the source cache.
/// Deterministic: the same cache contents always produce byte-identical
/// output, which is what lets the xDS caches skip pushing unchanged
/// resources to subscribers.
pub fn build(cache: &SourceCache, config: &DagConfig) -> Dag {
    let mut status = StatusBook::new();

    let ingress_class = config.ingress_class.as_deref();
    let ingresses = filter_by_class(cache, ingress_class);
    let ingress_output = process_ingresses(&ingresses, &mut status);
    let proxy_output = process_httpproxies(cache, &mut status);

    let mut http_hosts = ingress_output.virtual_hosts;
    http_hosts.extend(proxy_output.virtual_hosts);
    http_hosts.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));

    let mut https_hosts = ingress_output.secure_virtual_hosts;
    https_hosts.extend(proxy_output.secure_virtual_hosts);
    https_hosts.sort_by(|a, b| a.virtualhost.fqdn.cmp(&b.virtualhost.fqdn));

    let mut listeners = Vec::new();
    if !http_hosts.is_empty() {
        listeners.push(Listener {
            name: "ingress_http".to_string(),
            protocol: ListenerProtocol::Http,
            address: "0.0.0.0".to_string(),
            port: 8080,
            virtual_hosts: http_hosts,
            secure_virtual_hosts: Vec::new(),
        });
    }
    if !https_hosts.is_empty() {
        listeners.push(Listener {
            name: "ingress_https".to_string(),
            protocol: ListenerProtocol::Https,
            address: "0.0.0.0".to_string(),
            port: 8443,
            virtual_hosts: Vec::new(),
            secure_virtual_hosts: https_hosts,
        });
    }

    Dag { listeners, statuses: status.into_vec() }
}

/// `SourceCache` doesn't filter by ingress class on read, so callers that
/// care build a scoped copy first. Only Ingress objects carry a class.
fn filter_by_class(cache: &SourceCache, ingress_class: Option<&str>) -> SourceCache {
    use crate::domain::ClusterObject;

    let scoped = SourceCache::new();
    for ingress in cache.ingresses.iter() {
        let matches = match ingress_class {
            None => true,
            Some(class) => {
                ingress.effective_ingress_class().map(|c| c == class).unwrap_or(class == "edgeplane")
            }
        };
        if matches {
            scoped.upsert(ClusterObject::Ingress(ingress));
        }
    }
    for service in cache.services.iter() {
        scoped.upsert(ClusterObject::Service(service));
    }
    for secret in cache.secrets.iter() {
        scoped.upsert(ClusterObject::Secret(secret));
    }
    scoped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ingress::{
        Ingress, IngressBackend, IngressPath, IngressRule, IngressStatus, IngressTls,
    };
    use crate::domain::secret::{Secret, SecretData};
    use crate::domain::service::{Protocol, Service, ServicePort};
    use crate::domain::{ClusterObject, ObjectKey};
    use std::collections::HashMap;

    fn minimal_ingress() -> Ingress {
        Ingress {
            key: ObjectKey::new("default", "simple"),
            resource_version: "1".into(),
            ingress_class_name: None,
            annotations: HashMap::new(),
            default_backend: Some(IngressBackend { service_name: "web".into(), service_port: "80".into() }),
            rules: vec![],
            tls: vec![],
            status: IngressStatus::default(),
        }
    }

    fn web_service() -> Service {
        Service {
            key: ObjectKey::new("default", "web"),
            resource_version: "1".into(),
            ports: vec![ServicePort { number: 80, name: None, protocol: Protocol::Tcp }],
        }
    }

    #[test]
    fn minimal_ingress_produces_one_http_listener() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(web_service()));
        cache.upsert(ClusterObject::Ingress(minimal_ingress()));

        let dag = build(&cache, &DagConfig::default());
        assert_eq!(dag.listeners.len(), 1);
        assert_eq!(dag.listeners[0].protocol, ListenerProtocol::Http);
        let vhost = &dag.listeners[0].virtual_hosts[0];
        assert_eq!(vhost.fqdn, "*");
        assert_eq!(vhost.routes[0].clusters[0].service, ObjectKey::new("default", "web"));
    }

    #[test]
    fn tls_host_produces_https_listener() {
        let cache = SourceCache::new();
        cache.upsert(ClusterObject::Service(web_service()));

        let mut ingress = minimal_ingress();
        ingress.default_backend = None;
        ingress.rules = vec![IngressRule {
            host: Some("example.com".into()),
            paths: vec![IngressPath {
                path: Some("/".into()),
                backend: IngressBackend { service_name: "web".into(), service_port: "80".into() },
            }],
        }];
        ingress.tls = vec![IngressTls { hosts: vec!["example.com".into()], secret_name: "example-tls".into() }];
        cache.upsert(ClusterObject::Ingress(ingress));

        cache.upsert(ClusterObject::Secret(Secret {
            key: ObjectKey::new("default", "example-tls"),
            resource_version: "1".into(),
            data: SecretData::Tls { certificate_chain: b"cert".to_vec(), private_key: b"key".to_vec() },
        }));

        let dag = build(&cache, &DagConfig::default());
        assert_eq!(dag.listeners.len(), 1);
        assert_eq!(dag.listeners[0].protocol, ListenerProtocol::Https);
        assert_eq!(dag.listeners[0].secure_virtual_hosts[0].virtualhost.fqdn, "example.com");
    }
}
