use std::sync::Arc;

use edgeplane::cache::{load_fixture, SourceCache};
use edgeplane::cli::Cli;
use edgeplane::dag::DagHandle;
use edgeplane::events::Coalescer;
use edgeplane::observability::{init_tracing, log_config_info};
use edgeplane::xds::XdsCaches;
use edgeplane::{config, dag, xds, Result};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let app_config = config::load_config(cli.config.as_ref())?;

    init_tracing(&app_config.observability)?;
    log_config_info(&app_config);

    let source_cache = match &cli.fixture {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .map_err(|e| edgeplane::Error::config(format!("failed to read fixture {}: {e}", path.display())))?;
            info!(path = %path.display(), "loading cluster objects from fixture");
            Arc::new(load_fixture(&yaml)?)
        }
        None => {
            warn!("no fixture configured; source cache starts empty and no live source is wired in");
            Arc::new(SourceCache::new())
        }
    };

    let dag_handle: DagHandle = dag::new_handle();
    let xds_caches = Arc::new(XdsCaches::new());

    rebuild(&source_cache, &app_config.dag, &dag_handle, &xds_caches, 0);

    let (_sender, coalescer_stop) = {
        let source_cache = source_cache.clone();
        let dag_handle = dag_handle.clone();
        let xds_caches = xds_caches.clone();
        let dag_config = app_config.dag.clone();
        let coalescer = Coalescer::new(app_config.dag.holdoff_delay(), app_config.dag.holdoff_max_delay());
        coalescer.spawn(Arc::new(move |seq: edgeplane::events::Sequence| {
            rebuild(&source_cache, &dag_config, &dag_handle, &xds_caches, seq.0);
        }))
    };

    let shutdown = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
        info!("shutdown signal received");
    };

    if app_config.debug.enabled {
        let debug_state = edgeplane::debug::DebugState { dag: dag_handle.clone(), caches: xds_caches.clone() };
        let debug_addr = app_config.debug.socket_addr()?;
        let debug_router = edgeplane::debug::router(debug_state);
        tokio::spawn(async move {
            info!(address = %debug_addr, "starting debug HTTP surface");
            let listener = match tokio::net::TcpListener::bind(debug_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(error = %e, "failed to bind debug HTTP surface");
                    return;
                }
            };
            if let Err(e) = axum::serve(listener, debug_router).await {
                warn!(error = %e, "debug HTTP surface exited with an error");
            }
        });
    }

    xds::serve(&app_config.xds, xds_caches, shutdown).await?;

    coalescer_stop.notify_one();
    info!("xDS server shutdown completed");
    Ok(())
}

fn rebuild(
    source_cache: &Arc<SourceCache>,
    dag_config: &config::DagConfig,
    dag_handle: &DagHandle,
    xds_caches: &Arc<XdsCaches>,
    sequence: u64,
) {
    let built = dag::build(source_cache, dag_config);
    let listener_count = built.listeners.len();
    xds::translator::translate(&built, source_cache, xds_caches);
    dag::store(dag_handle, built);
    info!(sequence, listener_count, "dag rebuilt");
}
