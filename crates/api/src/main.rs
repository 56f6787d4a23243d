use std::sync::Arc;
use std::time::Duration;

use advisory_site_api::background::{spawn_audit_log, spawn_cache_sweeper, GC_INTERVAL};
use advisory_site_api::config::AppConfig;
use advisory_site_api::middleware;
use advisory_site_api::state::AppState;
use advisory_site_core::auth::http::HttpAuthenticator;
use advisory_site_core::events::bus::EventBus;
use advisory_site_core::store::http::HttpObjectStorage;
use advisory_site_core::store::postgres::PgContentRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config =
        AppConfig::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting advisory site server");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

    tracing::info!("Database migrations applied");
    if config.store.uses_custom_tables() {
        tracing::warn!(
            content_table = %config.store.content_table,
            insights_table = %config.store.insights_table,
            "custom table names are not created by the migrations and must already exist"
        );
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let repo = Arc::new(PgContentRepository::new(pool, &config.store)?);
    let storage = Arc::new(HttpObjectStorage::new(client.clone(), &config.store));
    let auth = Arc::new(HttpAuthenticator::new(client, &config.store));

    let event_bus = EventBus::new(config.event_bus_capacity);
    spawn_audit_log(&event_bus);

    let state = AppState::new(config.clone(), repo, storage, auth, event_bus)?;
    spawn_cache_sweeper(state.site().clone(), GC_INTERVAL);

    let app = advisory_site_api::build_router(state)
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer(&config.cors_origins));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
