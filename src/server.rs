//! HTTP server initialization and runtime setup.
//!
//! Handles the database pool, store startup, analytics workers, and the Axum
//! server lifecycle including graceful shutdown.

use crate::api::middleware::rate_limit;
use crate::application::services::AnalyticsService;
use crate::application::store::Store;
use crate::config::Config;
use crate::domain::dispatcher::EventDispatcher;
use crate::infrastructure::analytics::{
    AccessLogDispatcher, PlausibleDispatcher, WebhookDispatcher,
};
use crate::infrastructure::persistence::SqliteRecordRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - SQLite connection pool and schema
/// - Record store (cache warm-up, flush worker, expiry reaper)
/// - Analytics workers (if enabled)
/// - Axum HTTP server
///
/// On Ctrl-C or SIGTERM the server stops accepting requests, the store drains
/// its write buffer, and only then is the pool closed.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or bootstrap fails
/// - The initial cache load fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    let repository = Arc::new(SqliteRecordRepository::new(Arc::new(pool.clone())));
    repository
        .bootstrap()
        .await
        .context("Failed to initialize database schema")?;

    let mut store = Store::open(repository, config.store_config())
        .await
        .context("Failed to load records into cache")?;

    if config.analytics_enabled {
        let dispatchers = build_dispatchers(&config).await?;
        let (analytics, _workers) = AnalyticsService::start(
            dispatchers,
            config.analytics_workers,
            config.analytics_queue_capacity,
        );
        store = store.with_notifier(Arc::new(analytics));
    } else {
        tracing::info!("Analytics disabled");
    }

    let store = Arc::new(store);
    let state = AppState::new(store.clone(), &config.public_url);

    let limiter = rate_limit::layer(config.rate_limit_per_second, config.rate_limit_burst)?;
    let app = app_router(state, limiter);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.shutdown().await;
    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn connect_pool(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("Invalid DATABASE_URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Builds the configured analytics sinks.
async fn build_dispatchers(config: &Config) -> Result<Vec<Arc<dyn EventDispatcher>>> {
    let mut dispatchers: Vec<Arc<dyn EventDispatcher>> = Vec::new();

    if config.access_log_enabled {
        let dispatcher = AccessLogDispatcher::new(config.access_log_path.as_deref().map(Path::new))
            .await
            .context("Failed to open access log")?;
        dispatchers.push(Arc::new(dispatcher));
    }

    if let Some(url) = &config.webhook_url {
        dispatchers.push(Arc::new(WebhookDispatcher::new(
            url,
            Duration::from_secs(config.webhook_timeout_secs),
            &config.webhook_headers,
        )?));
    }

    if let Some(url) = &config.plausible_url {
        dispatchers.push(Arc::new(PlausibleDispatcher::new(
            url,
            &config.public_url,
            Duration::from_secs(config.plausible_timeout_secs),
        )?));
    }

    if dispatchers.is_empty() {
        tracing::warn!("Analytics enabled but no sinks configured");
    }

    Ok(dispatchers)
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, draining");
}
