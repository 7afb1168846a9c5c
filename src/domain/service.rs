use serde::{Deserialize, Serialize};

use super::ObjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub number: u16,
    pub name: Option<String>,
    pub protocol: Protocol,
}

/// A named backend with a list of ports. Resolved by routes/ingress rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub key: ObjectKey,
    pub resource_version: String,
    pub ports: Vec<ServicePort>,
}

impl Service {
    pub fn port(&self, port_id: &str) -> Option<&ServicePort> {
        self.ports
            .iter()
            .find(|p| p.number.to_string() == port_id || p.name.as_deref() == Some(port_id))
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.ports == other.ports
    }
}
