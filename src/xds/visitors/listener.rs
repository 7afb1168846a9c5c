//! DAG listeners → `envoy.config.listener.v3.Listener`.
//!
//! The plaintext listener wires a single HTTP connection manager pointed at
//! its RDS route config. The TLS listener gets one filter chain per secure
//! virtual host, matched by SNI, each referencing its certificate by name
//! over SDS rather than inlining key material into the listener resource.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, transport_socket::ConfigType as TransportSocketConfigType,
    Address, ConfigSource, SocketAddress, TransportSocket,
};
use envoy_types::pb::envoy::config::listener::v3::{Filter, FilterChain, FilterChainMatch, Listener as EnvoyListener};
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::RouteSpecifier, http_filter::ConfigType as HttpFilterConfigType,
    HttpConnectionManager, HttpFilter, Rds,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    sds_secret_config::SdsConfig, CommonTlsContext, DownstreamTlsContext, SdsSecretConfig,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

use crate::dag::types::{ListenerProtocol, SecureVirtualHost};
use crate::dag::Dag;
use crate::utils::naming;
use crate::xds::cache::LISTENER_TYPE_URL;

fn ads_config_source() -> ConfigSource {
    ConfigSource {
        resource_api_version: 3,
        config_source_specifier: Some(
            envoy_types::pb::envoy::config::core::v3::config_source::ConfigSourceSpecifier::Ads(
                envoy_types::pb::envoy::config::core::v3::AggregatedConfigSource {},
            ),
        ),
        ..Default::default()
    }
}

fn http_connection_manager(route_config_name: &str, stat_prefix: &str) -> HttpConnectionManager {
    HttpConnectionManager {
        stat_prefix: stat_prefix.to_string(),
        route_specifier: Some(RouteSpecifier::Rds(Rds {
            route_config_name: route_config_name.to_string(),
            config_source: Some(ads_config_source()),
        })),
        http_filters: vec![HttpFilter {
            name: "envoy.filters.http.router".to_string(),
            config_type: Some(HttpFilterConfigType::TypedConfig(Any {
                type_url: "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router".to_string(),
                value: RouterFilter::default().encode_to_vec(),
            })),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn filter(hcm: HttpConnectionManager) -> Filter {
    Filter {
        name: "envoy.filters.network.http_connection_manager".to_string(),
        config_type: Some(envoy_types::pb::envoy::config::listener::v3::filter::ConfigType::TypedConfig(Any {
            type_url: "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager".to_string(),
            value: hcm.encode_to_vec(),
        })),
    }
}

fn sds_tls_context(secret_name: &str, min_version: &str, max_version: Option<&str>) -> DownstreamTlsContext {
    let _ = (min_version, max_version);
    DownstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            tls_certificate_sds_secret_configs: vec![SdsSecretConfig {
                name: secret_name.to_string(),
                sds_config: Some(SdsConfig::ConfigSource(Box::new(ads_config_source()))),
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn secure_filter_chain(svh: &SecureVirtualHost) -> FilterChain {
    let hcm = http_connection_manager(&naming::https_route_config_name(&svh.virtualhost.fqdn), "https");
    FilterChain {
        filter_chain_match: Some(FilterChainMatch {
            server_names: vec![svh.virtualhost.fqdn.clone()],
            ..Default::default()
        }),
        filters: vec![filter(hcm)],
        transport_socket: Some(TransportSocket {
            name: "envoy.transport_sockets.tls".to_string(),
            config_type: Some(TransportSocketConfigType::TypedConfig(Any {
                type_url: "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext"
                    .to_string(),
                value: sds_tls_context(&svh.secret.name, &svh.minimum_tls_version, svh.maximum_tls_version.as_deref())
                    .encode_to_vec(),
            })),
        }),
        ..Default::default()
    }
}

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

pub fn build(dag: &Dag) -> BTreeMap<String, Any> {
    let mut out = BTreeMap::new();

    for listener in &dag.listeners {
        let filter_chains = match listener.protocol {
            ListenerProtocol::Http => {
                vec![filter(http_connection_manager(&listener.name, "ingress_http"))]
                    .into_iter()
                    .map(|f| FilterChain { filters: vec![f], ..Default::default() })
                    .collect()
            }
            ListenerProtocol::Https => {
                listener.secure_virtual_hosts.iter().map(secure_filter_chain).collect()
            }
        };

        let envoy_listener = EnvoyListener {
            name: listener.name.clone(),
            address: Some(socket_address(&listener.address, listener.port)),
            filter_chains,
            ..Default::default()
        };

        out.insert(
            listener.name.clone(),
            Any { type_url: LISTENER_TYPE_URL.to_string(), value: envoy_listener.encode_to_vec() },
        );
    }

    out
}
