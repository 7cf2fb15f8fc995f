//! Eventhub HTTP server.
//!
//! Seat ledger over `PostgreSQL` with a REST API and a live change feed.

use anyhow::Context;
use eventhub::{
    Config,
    auth::JwtVerifier,
    blob::LocalBlobStore,
    metrics, notifier,
    server::{AppState, Integrations, build_router},
};
use seatledger_core::environment::SystemClock;
use seatledger_postgres::{PostgresChangeFeed, PostgresStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,eventhub=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting eventhub server");

    let config = Config::from_env();
    info!(
        server = %config.server_addr(),
        metrics = %config.metrics_addr(),
        notifier = config.notifier.url.as_deref().unwrap_or("log only"),
        blob_dir = %config.blobs.dir.display(),
        "Configuration loaded"
    );

    let metrics_addr: SocketAddr = config
        .metrics_addr()
        .parse()
        .context("Invalid metrics address")?;
    metrics::install_exporter(metrics_addr).context("Failed to start metrics exporter")?;
    metrics::register_metrics();
    info!(address = %metrics_addr, "Metrics exporter listening");

    info!("Connecting to database...");
    let store = Arc::new(
        PostgresStore::connect_with(config.database.pool_options(), &config.database.url)
            .await
            .context("Failed to connect to database")?,
    );
    if config.database.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
    }
    info!("Database connected");

    let feed = PostgresChangeFeed::start(&store)
        .await
        .context("Failed to start change feed")?;

    let integrations = Integrations {
        feed: Arc::new(feed),
        notifier: notifier::from_config(&config.notifier)
            .context("Failed to build notifier client")?,
        blobs: Arc::new(LocalBlobStore::from_config(&config.blobs)),
        clock: Arc::new(SystemClock),
        jwt: Arc::new(JwtVerifier::new(&config.auth.jwt_secret)),
        reminder_window: config.reminder_window(),
        max_upload_bytes: config.blobs.max_upload_bytes,
    };
    let state = AppState::new(store, integrations);

    let app = build_router(state).nest_service("/static", ServeDir::new(&config.blobs.dir));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
