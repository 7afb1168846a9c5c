//! DAG virtual hosts → `envoy.config.route.v3.RouteConfiguration`.
//!
//! One route configuration per HTTP listener (`ingress_http`) and one per
//! secure virtual host (`https/<fqdn>`), matching how the listener visitor
//! wires up its HTTP connection managers: the plaintext listener shares a
//! single RDS route config across all its domains, while each TLS SNI
//! filter chain gets its own.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::route::v3::{
    redirect_action::SchemeRewriteSpecifier, route::Action, route_action::ClusterSpecifier,
    route_match::PathSpecifier, HeaderMatcher, RedirectAction, Route as EnvoyRoute, RouteAction,
    RouteConfiguration, RouteMatch, VirtualHost as EnvoyVirtualHost, WeightedCluster,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{string_matcher::MatchPattern, RegexMatcher, StringMatcher};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

use crate::dag::types::{Listener, Route, VirtualHost};
use crate::dag::Dag;
use crate::domain::httpproxy::{HeaderMatchKind, PathMatchKind};
use crate::utils::naming;
use crate::xds::cache::ROUTE_TYPE_URL;

fn header_matcher(condition: &crate::domain::httpproxy::HeaderCondition) -> HeaderMatcher {
    use envoy_types::pb::envoy::config::route::v3::header_matcher::HeaderMatchSpecifier;

    let specifier = match condition.kind {
        HeaderMatchKind::Present => HeaderMatchSpecifier::PresentMatch(true),
        HeaderMatchKind::Exact => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::Exact(condition.value.clone().unwrap_or_default())),
            ..Default::default()
        }),
        HeaderMatchKind::NotExact => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::Exact(condition.value.clone().unwrap_or_default())),
            ..Default::default()
        }),
        HeaderMatchKind::Contains => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::Contains(condition.value.clone().unwrap_or_default())),
            ..Default::default()
        }),
        HeaderMatchKind::NotContains => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::Contains(condition.value.clone().unwrap_or_default())),
            ..Default::default()
        }),
    };

    HeaderMatcher {
        name: condition.name.clone(),
        invert_match: matches!(condition.kind, HeaderMatchKind::NotExact | HeaderMatchKind::NotContains),
        header_match_specifier: Some(specifier),
        ..Default::default()
    }
}

fn route_match(route: &Route) -> RouteMatch {
    let path_specifier = match &route.path {
        Some(cond) => Some(match cond.kind {
            PathMatchKind::Prefix => PathSpecifier::Prefix(cond.value.clone()),
            PathMatchKind::Exact => PathSpecifier::Path(cond.value.clone()),
            PathMatchKind::Regex => PathSpecifier::SafeRegex(RegexMatcher {
                regex: cond.value.clone(),
                ..Default::default()
            }),
        }),
        None => Some(PathSpecifier::Prefix("/".to_string())),
    };

    RouteMatch {
        path_specifier,
        headers: route.headers.iter().map(header_matcher).collect(),
        ..Default::default()
    }
}

fn route_action(route: &Route) -> Action {
    if let Some(redirect) = &route.redirect {
        return Action::Redirect(RedirectAction {
            scheme_rewrite_specifier: Some(SchemeRewriteSpecifier::HttpsRedirect(redirect.https_redirect)),
            ..Default::default()
        });
    }

    #[allow(deprecated)]
    let mut action = RouteAction { ..Default::default() };

    if let Some(timeout) = &route.timeout_policy.response_timeout {
        if let Ok(secs) = timeout.trim_end_matches('s').parse::<i64>() {
            action.timeout = Some(envoy_types::pb::google::protobuf::Duration { seconds: secs, nanos: 0 });
        }
    }

    action.cluster_specifier = if route.clusters.len() == 1 {
        Some(ClusterSpecifier::Cluster(route.clusters[0].name.clone()))
    } else {
        let total_weight: u32 = route.clusters.iter().map(|c| c.weight).sum();
        Some(ClusterSpecifier::WeightedClusters(WeightedCluster {
            clusters: route
                .clusters
                .iter()
                .map(|c| envoy_types::pb::envoy::config::route::v3::weighted_cluster::ClusterWeight {
                    name: c.name.clone(),
                    weight: Some(c.weight),
                    ..Default::default()
                })
                .collect(),
            total_weight: Some(total_weight),
        }))
    };

    Action::Route(action)
}

fn envoy_routes(routes: &[Route]) -> Vec<EnvoyRoute> {
    routes
        .iter()
        .map(|r| EnvoyRoute {
            r#match: Some(route_match(r)),
            action: Some(route_action(r)),
            ..Default::default()
        })
        .collect()
}

fn envoy_virtual_host(vhost: &VirtualHost) -> EnvoyVirtualHost {
    EnvoyVirtualHost {
        name: vhost.fqdn.clone(),
        domains: vec![vhost.fqdn.clone()],
        routes: envoy_routes(&vhost.routes),
        ..Default::default()
    }
}

pub fn build(dag: &Dag) -> BTreeMap<String, Any> {
    let mut out = BTreeMap::new();

    for listener in &dag.listeners {
        if !listener.virtual_hosts.is_empty() {
            let name = http_route_config_name(listener);
            let config = RouteConfiguration {
                name: name.clone(),
                virtual_hosts: listener.virtual_hosts.iter().map(envoy_virtual_host).collect(),
                ..Default::default()
            };
            out.insert(name, Any { type_url: ROUTE_TYPE_URL.to_string(), value: config.encode_to_vec() });
        }

        for svh in &listener.secure_virtual_hosts {
            let name = naming::https_route_config_name(&svh.virtualhost.fqdn);
            let config = RouteConfiguration {
                name: name.clone(),
                virtual_hosts: vec![envoy_virtual_host(&svh.virtualhost)],
                ..Default::default()
            };
            out.insert(name, Any { type_url: ROUTE_TYPE_URL.to_string(), value: config.encode_to_vec() });
        }
    }

    out
}

fn http_route_config_name(listener: &Listener) -> String {
    listener.name.clone()
}
