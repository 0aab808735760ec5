//! Goods log consumer
//!
//! Subscribes to goods events on NATS and writes them to ClickHouse in
//! batches every few seconds. Runs until Ctrl-C / SIGTERM, then flushes
//! whatever is still buffered.

use std::sync::Arc;

use anyhow::{Context, Result};
use goods_core::common::utils::retry_connect;
use goods_core::domains::goods_log::{
    BatcherConfig, ClickHouseGoodsLog, EventBatcher, GoodsLogConsumer,
};
use goods_core::kernel::ServiceHost;
use goods_core::ConsumerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,goods_core=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting goods log consumer");

    let config = ConsumerConfig::from_env().context("Failed to load configuration")?;

    let clickhouse = ClickHouseGoodsLog::connect(
        &config.clickhouse_url,
        config.clickhouse_user.as_deref(),
        config.clickhouse_password.as_deref(),
        config.clickhouse_database.as_deref(),
    );
    retry_connect("clickhouse", config.connect_retry, || clickhouse.ping())
        .await
        .context("Failed to connect to ClickHouse")?;
    clickhouse.ensure_schema().await?;

    let nats = retry_connect("nats", config.connect_retry, || {
        let url = config.nats_url.clone();
        async move { anyhow::Ok(async_nats::connect(url).await?) }
    })
    .await
    .context("Failed to connect to NATS")?;

    let batcher = Arc::new(EventBatcher::new(
        Arc::new(clickhouse),
        BatcherConfig::default(),
    ));
    tracing::info!(
        subject = %config.nats_log_topic,
        flush_interval = ?batcher.config().flush_interval,
        "Consuming goods events"
    );

    ServiceHost::new()
        .with_service(GoodsLogConsumer::new(nats, config.nats_log_topic, batcher))
        .run_until_shutdown()
        .await
}
