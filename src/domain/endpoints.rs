use serde::{Deserialize, Serialize};

use super::ObjectKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPort {
    pub name: Option<String>,
    pub port: u16,
}

/// One readiness-filtered group of addresses sharing the same port set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSubset {
    pub addresses: Vec<String>,
    pub ports: Vec<EndpointPort>,
}

/// The readiness-filtered set of address/port tuples backing a [`super::Service`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub key: ObjectKey,
    pub resource_version: String,
    pub subsets: Vec<EndpointSubset>,
}

impl Endpoints {
    /// Flatten subsets into `(address, port)` pairs for a named or numbered
    /// port, sorted ascending for deterministic EDS output.
    pub fn addresses_for_port(&self, port_id: &str) -> Vec<(String, u16)> {
        let mut out = Vec::new();
        for subset in &self.subsets {
            for port in &subset.ports {
                let matches = port.port.to_string() == port_id || port.name.as_deref() == Some(port_id);
                if !matches {
                    continue;
                }
                for addr in &subset.addresses {
                    out.push((addr.clone(), port.port));
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

impl PartialEq for Endpoints {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.subsets == other.subsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_sorted_and_deduped() {
        let endpoints = Endpoints {
            key: ObjectKey::new("default", "backend"),
            resource_version: "1".into(),
            subsets: vec![EndpointSubset {
                addresses: vec!["10.0.0.2".into(), "10.0.0.1".into()],
                ports: vec![EndpointPort { name: None, port: 8080 }],
            }],
        };
        assert_eq!(
            endpoints.addresses_for_port("8080"),
            vec![("10.0.0.1".to_string(), 8080), ("10.0.0.2".to_string(), 8080)]
        );
    }
}
