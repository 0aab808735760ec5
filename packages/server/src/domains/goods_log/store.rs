//! Analytical store for goods events.
//!
//! A flush opens one batch, inserts every buffered event into it and
//! commits once. Rows go to the append-only `goods_log` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clickhouse::insert::Insert;
use clickhouse::{Client, Row};
use serde::Serialize;
use tracing::info;

use crate::domains::goods::GoodEvent;

pub const GOODS_LOG_TABLE: &str = "goods_log";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS goods_log (
    id         Int64,
    project_id Int64,
    action     LowCardinality(String),
    timestamp  DateTime64(3, 'UTC')
)
ENGINE = MergeTree
ORDER BY (project_id, timestamp, id)
"#;

/// One row of `goods_log`.
#[derive(Debug, Clone, PartialEq, Eq, Row, Serialize)]
pub struct GoodsLogRow {
    pub id: i64,
    pub project_id: i64,
    pub action: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl From<&GoodEvent> for GoodsLogRow {
    fn from(event: &GoodEvent) -> Self {
        Self {
            id: event.id.get(),
            project_id: event.project_id.get(),
            action: event.action.as_str().to_string(),
            timestamp: event.timestamp.timestamp_millis(),
        }
    }
}

#[async_trait]
pub trait GoodsLogStore: Send + Sync {
    /// Open a batch; failing here leaves nothing written.
    async fn begin_batch(&self) -> Result<Box<dyn GoodsLogBatch>>;
}

#[async_trait]
pub trait GoodsLogBatch: Send {
    async fn insert(&mut self, event: &GoodEvent) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[derive(Clone)]
pub struct ClickHouseGoodsLog {
    client: Client,
}

impl ClickHouseGoodsLog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn connect(
        url: &str,
        user: Option<&str>,
        password: Option<&str>,
        database: Option<&str>,
    ) -> Self {
        let mut client = Client::default().with_url(url);
        if let Some(user) = user {
            client = client.with_user(user);
        }
        if let Some(password) = password {
            client = client.with_password(password);
        }
        if let Some(database) = database {
            client = client.with_database(database);
        }
        Self::new(client)
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .context("ClickHouse ping failed")
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.client
            .query(CREATE_TABLE)
            .execute()
            .await
            .context("failed to create goods_log table")?;
        info!(table = GOODS_LOG_TABLE, "goods log schema ready");
        Ok(())
    }
}

#[async_trait]
impl GoodsLogStore for ClickHouseGoodsLog {
    async fn begin_batch(&self) -> Result<Box<dyn GoodsLogBatch>> {
        let insert = self
            .client
            .insert::<GoodsLogRow>(GOODS_LOG_TABLE)
            .context("failed to prepare goods_log insert")?;
        Ok(Box::new(ClickHouseBatch { insert }))
    }
}

struct ClickHouseBatch {
    insert: Insert<GoodsLogRow>,
}

#[async_trait]
impl GoodsLogBatch for ClickHouseBatch {
    async fn insert(&mut self, event: &GoodEvent) -> Result<()> {
        let row = GoodsLogRow::from(event);
        self.insert.write(&row).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.insert.end().await?;
        Ok(())
    }
}
