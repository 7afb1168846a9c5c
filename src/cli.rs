//! Command-line flags. Configuration itself is layered (defaults → file →
//! env) in [`crate::config`]; these flags only select the file and, in dev
//! mode, a static fixture to seed the source cache with instead of a real
//! Kubernetes informer (out of scope for this crate).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "edgeplane", version, about = "Envoy ingress control plane")]
pub struct Cli {
    /// Path to a YAML configuration file, merged over the built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load a static YAML fixture of cluster objects at startup, standing
    /// in for a live source (e.g. a Kubernetes informer).
    #[arg(long, value_name = "PATH")]
    pub fixture: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
