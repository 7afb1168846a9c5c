//! DAG construction.
//!
//! The DAG is the single translation step between source objects (Ingress,
//! HTTPProxy, Service, Secret, Endpoints) and Envoy xDS resources. It is
//! rebuilt wholesale on every coalesced event batch; nothing here is
//! incremental, which is what keeps the translator simple and the output
//! deterministic.

pub mod builder;
pub mod httpproxy;
pub mod ingress;
pub mod ordering;
pub mod status;
pub mod types;

pub use builder::build;
pub use types::{Dag, Status};

use std::sync::{Arc, RwLock};

/// Shared handle to the current DAG snapshot. The event agent swaps in a
/// freshly built DAG after each rebuild; readers (debug surface, xDS
/// translator) take a cheap `Arc` clone of whatever is current.
pub type DagHandle = Arc<RwLock<Arc<Dag>>>;

pub fn new_handle() -> DagHandle {
    Arc::new(RwLock::new(Arc::new(Dag::default())))
}

pub fn load(handle: &DagHandle) -> Arc<Dag> {
    handle.read().expect("dag handle lock poisoned").clone()
}

pub fn store(handle: &DagHandle, dag: Dag) {
    *handle.write().expect("dag handle lock poisoned") = Arc::new(dag);
}
