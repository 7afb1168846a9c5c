//! Deterministic, length-bounded resource naming.
//!
//! Envoy resource names (cluster, SDS secret names) are derived from cluster
//! object identity. Envoy does not itself bound name length, but very long
//! names are awkward in logs/stats and some backends cap label length, so
//! names are hashed down to a fixed budget the same way the upstream
//! control-plane this was modeled on does it: keep the name human-legible by
//! truncating and appending a short stable hash rather than hashing the
//! whole name opaquely.

use sha2::{Digest, Sha256};

const MAX_NAME_LEN: usize = 60;
const HASH_LEN: usize = 6;
/// Budget reserved for the `-<hash>` suffix when truncating. Deliberately
/// wider than `HASH_LEN` so a truncated segment keeps a few bytes of
/// headroom instead of running right up to the limit.
const HASH_RESERVE: usize = 9;

/// Build the cluster/CLA name `namespace/service/port-id`, hashed down to
/// [`MAX_NAME_LEN`] bytes if needed. The final `/`-delimited segment (the
/// port identifier) is always preserved verbatim; only the
/// `namespace/service` prefix is truncated.
pub fn cluster_name(namespace: &str, service: &str, port_id: &str) -> String {
    hashname(MAX_NAME_LEN, &format!("{namespace}/{service}"), port_id)
}

/// Build a RouteConfiguration name for an SNI-scoped HTTPS vhost.
pub fn https_route_config_name(fqdn: &str) -> String {
    format!("https/{fqdn}")
}

/// Build the SDS secret resource name `namespace/name/<fingerprint>`.
pub fn secret_name(namespace: &str, name: &str, cert_der: &[u8]) -> String {
    format!("{namespace}/{name}/{}", fingerprint(cert_der))
}

/// Short stable hash of certificate bytes, used as part of the SDS name so a
/// rotated secret gets a new name and Envoy can hold both briefly.
pub fn fingerprint(cert_der: &[u8]) -> String {
    let digest = Sha256::digest(cert_der);
    hex::encode(&digest[..5])
}

/// Join `prefix` and `suffix` with `/`, truncating `prefix` and appending a
/// short hash of the untruncated name if the result would exceed `limit`
/// bytes. `suffix` (the last path segment) is never truncated.
fn hashname(limit: usize, prefix: &str, suffix: &str) -> String {
    let full = format!("{prefix}/{suffix}");
    if full.len() <= limit {
        return full;
    }

    let hash = &hex::encode(Sha256::digest(full.as_bytes()))[..HASH_LEN];
    let reserved = suffix.len() + 1 /* '/' */ + 1 /* '-' */ + HASH_RESERVE;
    let avail = limit.saturating_sub(reserved);
    let truncated = truncate_at_char_boundary(prefix, avail);

    format!("{truncated}-{hash}/{suffix}")
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_pass_through_unchanged() {
        assert_eq!(cluster_name("default", "backend", "80"), "default/backend/80");
    }

    #[test]
    fn long_names_are_hashed_and_bounded() {
        let name = cluster_name(
            "beurocratic-company-test-domain-1",
            "tiny-cog-department-test-instance",
            "80",
        );
        assert_eq!(name, "beurocratic-company-test-domain-1/tiny-cog-depa-52e801/80");
        assert!(name.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn hashing_is_stable_across_calls() {
        let a = cluster_name("ns", &"x".repeat(100), "443");
        let b = cluster_name("ns", &"x".repeat(100), "443");
        assert_eq!(a, b);
    }

    #[test]
    fn differing_inputs_differ() {
        let a = cluster_name("ns", &"x".repeat(100), "443");
        let b = cluster_name("ns", &"y".repeat(100), "443");
        assert_ne!(a, b);
    }

    #[test]
    fn secret_name_embeds_fingerprint() {
        let name = secret_name("default", "tls", b"certificate-bytes");
        assert!(name.starts_with("default/tls/"));
        assert_eq!(name, secret_name("default", "tls", b"certificate-bytes"));
    }

    proptest::proptest! {
        #[test]
        fn cluster_name_never_exceeds_budget(ns in "[a-z0-9-]{1,80}", svc in "[a-z0-9-]{1,80}", port in 1u16..=65535) {
            let name = cluster_name(&ns, &svc, &port.to_string());
            prop_assert!(name.len() <= MAX_NAME_LEN);
        }
    }
}
