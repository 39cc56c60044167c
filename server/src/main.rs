//! Recipe catalog HTTP server.
//!
//! Wires the `PostgreSQL` store, the optional Typesense index, the review
//! ingestion queue and the axum router together, then serves until
//! Ctrl+C or SIGTERM. On shutdown the HTTP server stops accepting
//! requests first, then the review queue is drained.

mod config;

use anyhow::Context;
use config::Config;
use recipe_catalog_core::SearchIndex;
use recipe_catalog_postgres::PostgresCatalogStore;
use recipe_catalog_runtime::metrics::MetricsServer;
use recipe_catalog_runtime::{Catalog, CatalogStores};
use recipe_catalog_search::{TypesenseConfig, TypesenseIndex};
use recipe_catalog_web::{build_router, AppState, LocalImageStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_catalog=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recipe catalog server");

    let config = Config::from_env();
    info!(
        bind = %config.bind_address(),
        queue_capacity = config.ingest.queue_capacity,
        max_concurrent_fetches = config.fanout.max_concurrent,
        search_enabled = config.search.is_some(),
        "Configuration loaded"
    );

    let store = PostgresCatalogStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    let mut stores = CatalogStores::from_store(Arc::new(store));

    let mut reindex = false;
    if let Some(search) = &config.search {
        let index = TypesenseIndex::new(
            TypesenseConfig::new(&search.url, &search.api_key)
                .with_collection(&search.collection),
        );
        match index.ensure_collection().await {
            Ok(()) => info!(collection = index.collection(), "Search collection ready"),
            Err(e) => warn!(error = %e, "Search collection unavailable, continuing"),
        }
        reindex = search.reindex_on_start;
        stores = stores.with_search(Arc::new(index));
    }

    let catalog = Arc::new(Catalog::start(stores, config.catalog_config()));

    if reindex {
        match catalog.reindex_all().await {
            Ok(count) => info!(count, "Search index rebuilt"),
            Err(e) => warn!(error = %e, "Search reindex failed"),
        }
    }

    let mut metrics = MetricsServer::new(
        config
            .metrics_address()
            .context("invalid metrics address")?,
    );
    metrics.start().context("failed to start metrics exporter")?;

    let images = Arc::new(LocalImageStore::new(&config.uploads.dir));
    let app = build_router(AppState::new(Arc::clone(&catalog), images));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped, draining review queue");
    match catalog.shutdown().await {
        Ok(report) => info!(
            processed = report.processed,
            failed = report.failed,
            "Review queue drained"
        ),
        Err(e) => error!(error = %e, "Review queue did not drain cleanly"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
