// Main entry point for the goods API server

use std::sync::Arc;

use anyhow::{Context, Result};
use goods_core::common::utils::retry_connect;
use goods_core::kernel::{
    shutdown_signal, BaseCache, NatsClientPublisher, NoopCache, RedisCache, ServerDeps,
};
use goods_core::server::build_app;
use goods_core::ServerConfig;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,goods_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting goods API");

    // Load configuration
    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let pool = retry_connect("postgres", config.connect_retry, || {
        let url = config.database_url.clone();
        async move {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await?;
            anyhow::Ok(pool)
        }
    })
    .await
    .context("Failed to connect to database")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Cache is optional: without Redis every list reads the database
    let cache: Arc<dyn BaseCache> = match RedisCache::connect(&config.redis_url).await {
        Ok(cache) => {
            tracing::info!("Redis connected");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, list cache disabled");
            Arc::new(NoopCache)
        }
    };

    let nats = retry_connect("nats", config.connect_retry, || {
        let url = config.nats_url.clone();
        async move { anyhow::Ok(async_nats::connect(url).await?) }
    })
    .await
    .context("Failed to connect to NATS")?;

    let deps = ServerDeps::new(
        pool.clone(),
        cache,
        Arc::new(NatsClientPublisher::new(nats.clone())),
        config.nats_log_topic.clone(),
    );
    let app = build_app(&deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Push out events still sitting in the client buffer
    if let Err(e) = nats.flush().await {
        tracing::warn!(error = %e, "Failed to flush NATS on shutdown");
    }
    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}
