//! DAG clusters + the source cache's `Endpoints` → `ClusterLoadAssignment`.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::core::v3::{address::Address as AddressType, Address, SocketAddress};
use envoy_types::pb::envoy::config::endpoint::v3::{
    lb_endpoint::HostIdentifier, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

use crate::cache::SourceCache;
use crate::dag::Dag;
use crate::domain::ObjectKey;
use crate::xds::cache::ENDPOINT_TYPE_URL;

fn socket_address(host: &str, port: u16) -> Address {
    Address {
        address: Some(AddressType::SocketAddress(SocketAddress {
            address: host.to_string(),
            port_specifier: Some(
                envoy_types::pb::envoy::config::core::v3::socket_address::PortSpecifier::PortValue(port as u32),
            ),
            ..Default::default()
        })),
    }
}

pub fn build(dag: &Dag, cache: &SourceCache) -> BTreeMap<String, Any> {
    let mut out = BTreeMap::new();

    for cluster in dag.all_clusters() {
        let Some(endpoints) = cache.endpoints.get(&ObjectKey::new(cluster.service.namespace.clone(), cluster.service.name.clone())) else {
            continue;
        };

        let lb_endpoints: Vec<LbEndpoint> = endpoints
            .addresses_for_port(&cluster.port_id)
            .into_iter()
            .map(|(addr, port)| LbEndpoint {
                host_identifier: Some(HostIdentifier::Endpoint(Endpoint {
                    address: Some(socket_address(&addr, port)),
                    ..Default::default()
                })),
                ..Default::default()
            })
            .collect();

        let cla = ClusterLoadAssignment {
            cluster_name: cluster.name.clone(),
            endpoints: vec![LocalityLbEndpoints { lb_endpoints, ..Default::default() }],
            ..Default::default()
        };

        out.insert(
            cluster.name.clone(),
            Any { type_url: ENDPOINT_TYPE_URL.to_string(), value: cla.encode_to_vec() },
        );
    }

    out
}
