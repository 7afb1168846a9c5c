//! Pushes a freshly built DAG into the xDS caches.
//!
//! Order matters for SotW consumers that apply updates eagerly: CDS before
//! EDS (so a cluster exists before its endpoints arrive), then RDS, then
//! LDS, then SDS. ADS subscribers get the same order over one stream.

use crate::cache::SourceCache;
use crate::dag::Dag;
use crate::xds::cache::XdsCaches;
use crate::xds::visitors;

pub fn translate(dag: &Dag, cache: &SourceCache, caches: &XdsCaches) {
    caches.clusters.update(visitors::cluster::build(dag));
    caches.endpoints.update(visitors::endpoints::build(dag, cache));
    caches.routes.update(visitors::route::build(dag));
    caches.listeners.update(visitors::listener::build(dag));
    caches.secrets.update(visitors::secret::build(dag));
}
