use serde::{Deserialize, Serialize};

use super::ObjectKey;

/// TLS material or an opaque CA bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SecretData {
    /// Certificate chain (leaf first) + private key, both PEM-encoded.
    Tls { certificate_chain: Vec<u8>, private_key: Vec<u8> },
    /// `ca.crt` only — valid as upstream/downstream client validation, never
    /// as a server TLS secret.
    CaBundle { ca_certificate: Vec<u8> },
}

impl PartialEq for SecretData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                SecretData::Tls { certificate_chain: c1, private_key: k1 },
                SecretData::Tls { certificate_chain: c2, private_key: k2 },
            ) => c1 == c2 && k1 == k2,
            (SecretData::CaBundle { ca_certificate: a }, SecretData::CaBundle { ca_certificate: b }) => {
                a == b
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub key: ObjectKey,
    pub resource_version: String,
    pub data: SecretData,
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.data == other.data
    }
}

impl Secret {
    pub fn is_server_secret(&self) -> bool {
        matches!(self.data, SecretData::Tls { .. })
    }
}
