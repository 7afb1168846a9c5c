//! DAG clusters → `envoy.config.cluster.v3.Cluster`.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::cluster::v3::cluster::{ClusterDiscoveryType, DiscoveryType};
use envoy_types::pb::envoy::config::cluster::v3::Cluster as EnvoyCluster;
use envoy_types::pb::envoy::config::core::v3::{ApiConfigSource, ConfigSource, GrpcService};
use envoy_types::pb::google::protobuf::{Any, Duration};
use prost::Message;

use crate::dag::Dag;
use crate::xds::cache::CLUSTER_TYPE_URL;

const CONNECT_TIMEOUT_SECS: i64 = 5;

fn eds_config_source() -> ConfigSource {
    ConfigSource {
        resource_api_version: 3,
        config_source_specifier: Some(
            envoy_types::pb::envoy::config::core::v3::config_source::ConfigSourceSpecifier::ApiConfigSource(
                ApiConfigSource {
                    api_type: envoy_types::pb::envoy::config::core::v3::api_config_source::ApiType::Grpc as i32,
                    transport_api_version: 3,
                    grpc_services: vec![GrpcService { ..Default::default() }],
                    ..Default::default()
                },
            ),
        ),
        ..Default::default()
    }
}

pub fn build(dag: &Dag) -> BTreeMap<String, Any> {
    let mut out = BTreeMap::new();
    for cluster in dag.all_clusters() {
        let envoy_cluster = EnvoyCluster {
            name: cluster.name.clone(),
            connect_timeout: Some(Duration { seconds: CONNECT_TIMEOUT_SECS, nanos: 0 }),
            cluster_discovery_type: Some(ClusterDiscoveryType::Type(DiscoveryType::Eds as i32)),
            eds_cluster_config: Some(
                envoy_types::pb::envoy::config::cluster::v3::cluster::EdsClusterConfig {
                    eds_config: Some(eds_config_source()),
                    service_name: cluster.name.clone(),
                },
            ),
            ..Default::default()
        };

        out.insert(
            cluster.name.clone(),
            Any { type_url: CLUSTER_TYPE_URL.to_string(), value: envoy_cluster.encode_to_vec() },
        );
    }
    out
}
