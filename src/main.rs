use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rpi_k8s_management::app_state::build_app_state;
use rpi_k8s_management::core::client::cluster_api::{ClusterApi, KubeClusterApi};
use rpi_k8s_management::core::client::kube_client::build_kube_client;
use rpi_k8s_management::core::config::AppConfig;
use rpi_k8s_management::core::logging::init_tracing;
use rpi_k8s_management::core::ssh::probe_transport::ProbeTransport;
use rpi_k8s_management::core::ssh::ssh_session_pool::SshSessionPool;
use rpi_k8s_management::core::state::runtime::aggregation_cache::{
    AggregationCache, StaleThresholds,
};
use rpi_k8s_management::routes::app_router;
use rpi_k8s_management::scheduler::spawn_pollers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env().context("loading configuration")?);
    let _log_guard = init_tracing(&config.logging)?;

    info!(
        cluster = %config.cluster_name,
        bind = %config.bind_addr,
        "Starting rpi-k8s-management"
    );

    let client = build_kube_client(&config.kube).await?;
    let api: Arc<dyn ClusterApi> =
        Arc::new(KubeClusterApi::new(client).with_timeout(config.kube.request_timeout));
    let transport: Arc<dyn ProbeTransport> = Arc::new(SshSessionPool::new());
    let cache = AggregationCache::new(StaleThresholds::from(&config.polling)).shared();

    let cancel = CancellationToken::new();
    let pollers = spawn_pollers(&config, api.clone(), transport, cache.clone(), cancel.clone());

    let state = build_app_state(config.clone(), api, cache);
    let app = app_router(&config).with_state(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown requested; stopping pollers");
            shutdown.cancel();
        })
        .await
        .context("serving HTTP")?;

    // The server can also stop on its own; pollers must not outlive it.
    cancel.cancel();
    for handle in pollers {
        if let Err(e) = handle.await {
            error!("Poller task ended abnormally: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
