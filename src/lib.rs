use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod broadcast;
pub mod cleanup;
pub mod context;
pub mod directory;
pub mod hierarchy;
pub mod messages;
pub mod metrics;
pub mod models;
pub mod push;
pub mod routes;
pub mod store;
pub mod utils;
pub mod visibility;

#[cfg(test)]
mod test_support;

pub use broadcast_config::{Config, StorageBackend};
pub use broadcast_error::{AppError, AppResult};

use cleanup::ExpiredMessageCleanupTask;
use context::AppContext;
use store::{BroadcastStore, MemoryStore, PostgresStore};

/// Open the configured storage backend, applying migrations for Postgres
pub async fn connect_store(config: &Config) -> Result<Arc<dyn BroadcastStore>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=postgres")?;

            tracing::info!("Connecting to database...");
            let pool = store::create_pool(database_url, &config.db)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            let store = PostgresStore::new(pool);
            tracing::info!("Applying database migrations...");
            store.migrate().await?;
            tracing::info!("Database migrations applied successfully");

            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage - all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    // Before config, so warnings raised while loading it are logged
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    tracing::info!("=== Broadcast Server Starting ===");
    tracing::info!(
        storage = ?config.storage_backend,
        push_provider = ?config.push.provider,
        production = config.is_production,
        "Configuration loaded"
    );

    let store = connect_store(&config).await?;
    let push = push::build_gateway(&config.push).context("Failed to initialize push gateway")?;

    let app_context = Arc::new(AppContext::new(store.clone(), push, config.clone()));

    if config.messages.cleanup_interval_secs > 0 {
        let cleanup_task = ExpiredMessageCleanupTask::new(
            store,
            Duration::from_secs(config.messages.cleanup_interval_secs),
            config.messages.retention_days,
        );
        tokio::spawn(async move {
            cleanup_task.run().await;
        });
    } else {
        tracing::info!("Expired message cleanup disabled (MESSAGE_CLEANUP_INTERVAL_SECS=0)");
    }

    let app = routes::create_router(app_context);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Broadcast server listening on {}", config.bind_address);

    let server = axum::serve(listener, app);

    tokio::select! {
        res = server => {
            res.context("HTTP server failed")?;
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, shutting down.");
        },
    }

    Ok(())
}
