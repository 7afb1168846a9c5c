use serde::{Deserialize, Serialize};

use super::ObjectKey;

/// Permits a secret owned by this object's namespace to be referenced by
/// proxies in other namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub secret_name: String,
    /// Namespaces permitted to reference the secret. A single entry of `"*"`
    /// permits every namespace.
    pub target_namespaces: Vec<String>,
}

impl Delegation {
    pub fn permits(&self, namespace: &str) -> bool {
        self.target_namespaces.iter().any(|ns| ns == "*" || ns == namespace)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsCertificateDelegation {
    pub key: ObjectKey,
    pub resource_version: String,
    pub delegations: Vec<Delegation>,
}

impl PartialEq for TlsCertificateDelegation {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.delegations == other.delegations
    }
}
