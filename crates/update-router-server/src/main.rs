//! Entry point for the module-update-router binary.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use update_router_server::{
    Config, EventRelay, Metrics, Server,
    config::{DbDriver, LogFormat},
    events, metrics,
};
use update_router_store::{MemoryStore, PgStore, Store, StoreConfig};

/// How often histogram buffers are drained.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config.log_level, config.log_format);

    tracing::info!("Starting module-update-router");
    tracing::info!(
        "Configuration: addr={}, maddr={}, db_driver={:?}, log_level={}",
        config.listen_addr(),
        config.metrics_addr(),
        config.db_driver,
        config.log_level
    );

    let store = open_store(&config).await?;

    let metrics = Metrics::new()?;
    spawn_metrics_server(&config.metrics_addr(), metrics.clone()).await?;

    let relay = EventRelay::channel(config.event_buffer).map(|(relay, receiver)| {
        events::spawn_consumer(receiver);
        relay
    });

    let server = Server::new(
        config.listen_addr(),
        &config.api_roots(),
        store,
        relay,
        metrics,
    )?;
    for root in config.api_roots() {
        tracing::info!("Serving API under {}", root);
    }

    let result = server.serve_with_shutdown(shutdown_signal()).await;

    if let Err(e) = server.close().await {
        tracing::error!(error = %e, "Failed to close store");
    }
    result?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Open the configured store, applying reset and seed options.
async fn open_store(config: &Config) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.db_driver {
        DbDriver::Memory => {
            if config.seed_path.is_some() || config.reset {
                tracing::warn!("--seed-path and --reset only apply to the postgres driver");
            }
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        DbDriver::Postgres => {
            let store = PgStore::connect(StoreConfig::new(config.database_url())).await?;
            if config.reset {
                store.reset().await?;
            }
            if let Some(path) = &config.seed_path {
                store.seed(path).await?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Serve `/metrics` on `addr` in the background.
async fn spawn_metrics_server(addr: &str, metrics: Metrics) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving metrics on {}", addr);

    let upkeep = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics::router(metrics)).await {
            tracing::error!(error = %e, "Metrics server failed");
        }
    });

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
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
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
