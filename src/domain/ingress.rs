use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ObjectKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressBackend {
    pub service_name: String,
    pub service_port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressPath {
    pub path: Option<String>,
    pub backend: IngressBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub host: Option<String>,
    pub paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressTls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IngressStatus {
    pub load_balancer_ingress: Vec<String>,
}

/// Legacy `networking.k8s.io/v1` Ingress. Annotation-driven, one default
/// backend, an ordered rule list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingress {
    pub key: ObjectKey,
    pub resource_version: String,
    pub ingress_class_name: Option<String>,
    pub annotations: HashMap<String, String>,
    pub default_backend: Option<IngressBackend>,
    pub rules: Vec<IngressRule>,
    pub tls: Vec<IngressTls>,
    pub status: IngressStatus,
}

impl PartialEq for Ingress {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.ingress_class_name == other.ingress_class_name
            && self.annotations == other.annotations
            && self.default_backend == other.default_backend
            && self.rules == other.rules
            && self.tls == other.tls
    }
}

impl Ingress {
    /// Modern `ingressClassName` wins over the legacy annotation when both
    /// are present.
    pub fn effective_ingress_class(&self) -> Option<&str> {
        self.ingress_class_name
            .as_deref()
            .or_else(|| self.annotations.get("kubernetes.io/ingress.class").map(String::as_str))
    }

    fn contour_annotation(&self, suffix: &str) -> Option<&str> {
        self.annotations
            .get(&format!("projectcontour.io/{suffix}"))
            .or_else(|| self.annotations.get(&format!("contour.heptio.com/{suffix}")))
            .map(String::as_str)
    }

    pub fn minimum_tls_version(&self) -> Option<&str> {
        self.contour_annotation("tls-minimum-protocol-version")
    }

    pub fn websocket_routes(&self) -> Vec<&str> {
        self.contour_annotation("websocket-routes")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn response_timeout(&self) -> Option<&str> {
        self.contour_annotation("response-timeout")
    }

    pub fn request_timeout(&self) -> Option<&str> {
        self.contour_annotation("request-timeout")
    }

    pub fn num_retries(&self) -> Option<&str> {
        self.contour_annotation("num-retries")
    }

    pub fn retry_on(&self) -> Option<&str> {
        self.contour_annotation("retry-on")
    }

    /// `ingress.kubernetes.io/force-ssl-redirect` is checked before
    /// `nginx.ingress.kubernetes.io/ssl-redirect`; first match wins.
    pub fn force_ssl_redirect(&self) -> bool {
        self.annotations
            .get("ingress.kubernetes.io/force-ssl-redirect")
            .or_else(|| self.annotations.get("nginx.ingress.kubernetes.io/ssl-redirect"))
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingress_with(annotations: HashMap<String, String>) -> Ingress {
        Ingress {
            key: ObjectKey::new("default", "simple"),
            resource_version: "1".into(),
            ingress_class_name: None,
            annotations,
            default_backend: None,
            rules: vec![],
            tls: vec![],
            status: IngressStatus::default(),
        }
    }

    #[test]
    fn modern_ingress_class_field_wins_over_annotation() {
        let mut ingress = ingress_with(HashMap::from([(
            "kubernetes.io/ingress.class".to_string(),
            "nginx".to_string(),
        )]));
        ingress.ingress_class_name = Some("edgeplane".to_string());
        assert_eq!(ingress.effective_ingress_class(), Some("edgeplane"));
    }

    #[test]
    fn force_ssl_redirect_checks_both_annotations_in_order() {
        let ingress = ingress_with(HashMap::from([(
            "ingress.kubernetes.io/force-ssl-redirect".to_string(),
            "true".to_string(),
        )]));
        assert!(ingress.force_ssl_redirect());

        let ingress = ingress_with(HashMap::from([(
            "nginx.ingress.kubernetes.io/ssl-redirect".to_string(),
            "true".to_string(),
        )]));
        assert!(ingress.force_ssl_redirect());

        assert!(!ingress_with(HashMap::new()).force_ssl_redirect());
    }
}
