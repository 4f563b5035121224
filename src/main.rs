use hydration_app::config::{AppConfig, StoreBackend};
use hydration_app::store::{MemoryStore, RestStore, Store};
use hydration_app::{AppState, router};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env().inspect_err(|err| {
        error!("configuration error: {err}");
    })?;

    let store: Arc<dyn Store> = match &config.store {
        StoreBackend::Rest(store_config) => {
            info!(url = %store_config.url, "using remote store");
            Arc::new(RestStore::new(store_config)?)
        }
        StoreBackend::Memory => {
            warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    match store.ping().await {
        Ok(()) => info!("store connection ok"),
        Err(err) => warn!("store connection check failed: {err}"),
    }

    if config.mock_host {
        warn!("mock host identity enabled");
    }

    let app = router(AppState::new(store, config.mock_host));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
