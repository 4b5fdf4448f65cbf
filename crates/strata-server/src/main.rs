//! Strata HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use strata::cache::{DistributedStore, RedisStore, TieredCache};
use strata::config::Config;
use strata::customers::InMemoryCustomerRepository;
use strata_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        environment = %config.environment,
        cache_enabled = config.cache.enabled,
        "Strata starting"
    );

    let store = match &config.redis_url {
        Some(url) => match RedisStore::open(url) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::error!(error = %e, "Invalid STRATA_REDIS_URL, running local-only");
                None
            }
        },
        None => {
            tracing::warn!("No STRATA_REDIS_URL configured, running local-only");
            None
        }
    };

    if let Some(store) = &store {
        if store.is_available().await {
            tracing::info!(endpoint = %store.endpoint(), "Distributed cache tier connected");
        } else {
            tracing::warn!(
                endpoint = %store.endpoint(),
                "Distributed cache tier unreachable, serving local-only until it answers"
            );
        }
    }

    let cache = Arc::new(TieredCache::<RedisStore>::new(config.cache.clone(), store));
    let repository = Arc::new(InMemoryCustomerRepository::new());
    let state = HandlerState::new(repository, cache, config.environment);

    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Strata shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
