//! Deterministic route ordering.
//!
//! Envoy evaluates routes in array order and stops at the first match, so
//! the DAG must present them most-specific first: longer path matches
//! before shorter ones, exact before regex before prefix, routes carrying
//! header conditions before routes that match on path alone. Any remaining
//! tie breaks lexicographically on the path value so output is stable
//! across rebuilds.

use std::cmp::Ordering;

use crate::dag::types::Route;
use crate::domain::httpproxy::PathMatchKind;

fn kind_rank(kind: PathMatchKind) -> u8 {
    match kind {
        PathMatchKind::Exact => 0,
        PathMatchKind::Regex => 1,
        PathMatchKind::Prefix => 2,
    }
}

fn compare(a: &Route, b: &Route) -> Ordering {
    let path_len = |r: &Route| r.path.as_ref().map(|p| p.value.len()).unwrap_or(0);
    let path_kind = |r: &Route| r.path.as_ref().map(|p| kind_rank(p.kind)).unwrap_or(u8::MAX);
    let path_value = |r: &Route| r.path.as_ref().map(|p| p.value.clone()).unwrap_or_default();

    path_len(b)
        .cmp(&path_len(a))
        .then_with(|| path_kind(a).cmp(&path_kind(b)))
        .then_with(|| b.headers.len().cmp(&a.headers.len()))
        .then_with(|| path_value(a).cmp(&path_value(b)))
}

pub fn sort_routes(routes: &mut [Route]) {
    routes.sort_by(compare);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::types::{RetryPolicy, TimeoutPolicy};
    use crate::domain::httpproxy::PathCondition;

    fn route(path: Option<&str>, kind: PathMatchKind, headers: usize) -> Route {
        Route {
            path: path.map(|p| PathCondition { kind, value: p.to_string() }),
            headers: vec![],
            clusters: vec![],
            enable_websockets: false,
            timeout_policy: TimeoutPolicy::default(),
            retry_policy: RetryPolicy::default(),
            redirect: None,
        }
        .with_header_count(headers)
    }

    trait WithHeaderCount {
        fn with_header_count(self, n: usize) -> Self;
    }

    impl WithHeaderCount for Route {
        fn with_header_count(mut self, n: usize) -> Self {
            use crate::domain::httpproxy::{HeaderCondition, HeaderMatchKind};
            self.headers = (0..n)
                .map(|i| HeaderCondition {
                    name: format!("h{i}"),
                    kind: HeaderMatchKind::Present,
                    value: None,
                })
                .collect();
            self
        }
    }

    #[test]
    fn longer_prefixes_sort_first() {
        let mut routes = vec![
            route(Some("/a"), PathMatchKind::Prefix, 0),
            route(Some("/a/b/c"), PathMatchKind::Prefix, 0),
        ];
        sort_routes(&mut routes);
        assert_eq!(routes[0].path.as_ref().unwrap().value, "/a/b/c");
    }

    #[test]
    fn exact_beats_prefix_at_equal_length() {
        let mut routes = vec![
            route(Some("/api"), PathMatchKind::Prefix, 0),
            route(Some("/api"), PathMatchKind::Exact, 0),
        ];
        sort_routes(&mut routes);
        assert_eq!(routes[0].path.as_ref().unwrap().kind, PathMatchKind::Exact);
    }

    #[test]
    fn header_conditions_sort_before_path_only() {
        let mut routes = vec![
            route(Some("/api"), PathMatchKind::Prefix, 0),
            route(Some("/api"), PathMatchKind::Prefix, 1),
        ];
        sort_routes(&mut routes);
        assert_eq!(routes[0].headers.len(), 1);
    }
}
