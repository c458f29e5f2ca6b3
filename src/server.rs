//! HTTP server initialization and runtime setup.
//!
//! Connects the durable store and the cache, spawns the background tasks and
//! runs the Axum server until Ctrl+C or SIGTERM, then drains in order.

use crate::config::{CacheBackend, Config};
use crate::domain::click_flusher::run_click_flusher;
use crate::domain::click_worker::run_click_worker;
use crate::domain::expiry_sweeper::run_expiry_sweeper;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::routes::app_router;
use crate::state::{AppState, ServiceSettings};
use crate::utils::node_registry::NodeRegistry;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_ATTEMPTS: usize = 5;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level`; `LOG_FORMAT=json` switches to
/// one JSON object per line.
pub fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool (with retry) and migrations
/// - The configured cache backend (Redis falls back to no cache if unreachable)
/// - This node's ID generator, so a bad `NODE_ID` fails here
/// - Click worker, click flusher and expiry sweeper
/// - Axum HTTP server
///
/// On shutdown the server stops accepting requests, the click worker drains
/// the queue, and the flusher writes every pending counter to the store.
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail, the
/// node id is invalid, or the listener cannot bind.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = connect_cache(&config).await;

    let registry = Arc::new(NodeRegistry::new());
    let generator = registry
        .get_generator(config.node_id)
        .context("Failed to initialize ID generator")?;
    tracing::info!(node_id = generator.node_id(), "ID generator ready");

    let links: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(Arc::new(pool)));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(run_click_worker(
        click_rx,
        Arc::clone(&cache),
        Arc::clone(&links),
        config.click_worker_concurrency,
    ));
    let flusher = tokio::spawn(run_click_flusher(
        Arc::clone(&cache),
        Arc::clone(&links),
        Duration::from_secs(config.click_flush_interval_seconds),
        config.click_flush_batch,
        shutdown_rx.clone(),
    ));
    let sweeper = tokio::spawn(run_expiry_sweeper(
        Arc::clone(&links),
        Arc::clone(&cache),
        Duration::from_secs(config.sweep_interval_seconds),
        shutdown_rx,
    ));
    tracing::info!("Background tasks started");

    let settings = ServiceSettings {
        base_url: config.base_url.clone(),
        node_id: config.node_id,
        url_ttl: config.url_cache_ttl(),
        analytics_ttl: config.analytics_cache_ttl(),
        blocked_domains: config.blocked_domains.clone(),
    };
    let state = AppState::new(links, cache, registry, click_tx, settings);

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    // The router owns the last click senders; the worker ends once it is dropped.
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, draining clicks");

    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Click worker panicked");
    }

    let _ = shutdown_tx.send(true);

    for (name, task) in [("click flusher", flusher), ("expiry sweeper", sweeper)] {
        if let Err(e) = task.await {
            tracing::error!(error = %e, task = name, "Background task panicked");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Connects to PostgreSQL, retrying with exponential backoff.
async fn connect_database(config: &Config) -> Result<PgPool> {
    let url = config.database_url.as_str();
    let max_connections = config.db_max_connections;
    let acquire_timeout = config.store_timeout();

    let strategy = ExponentialBackoff::from_millis(10)
        .factor(10)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(DB_CONNECT_ATTEMPTS - 1);

    Retry::start(strategy, move || async move {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Database connection attempt failed"))
    })
    .await
    .context("Failed to connect to database")
}

/// Builds the configured cache backend.
async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(url)) => {
            match RedisCache::connect(url, config.store_timeout()).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to connect to Redis, caching disabled");
                    Arc::new(NullCache::new())
                }
            }
        }
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-process)");
            Arc::new(MemoryCache::new())
        }
        _ => {
            tracing::info!("Cache disabled");
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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

    tracing::info!("Shutdown requested");
}
