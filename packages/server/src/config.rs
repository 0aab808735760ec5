use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::common::utils::RetryPolicy;

/// How often the goods log consumer flushes its buffer.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Lifetime of a cached goods list page.
pub const CACHE_TTL: Duration = Duration::from_secs(60);

/// Startup connection attempts for Postgres, NATS and ClickHouse.
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Delay between startup connection attempts.
pub const CONNECT_DELAY: Duration = Duration::from_secs(2);

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_LOG_TOPIC: &str = "goods.log";

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub nats_url: String,
    pub nats_log_topic: String,
    pub port: u16,
    pub connect_retry: RetryPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| DEFAULT_NATS_URL.to_string()),
            nats_log_topic: env::var("NATS_LOG_TOPIC")
                .unwrap_or_else(|_| DEFAULT_LOG_TOPIC.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            connect_retry: RetryPolicy::startup(),
        })
    }
}

/// Goods log consumer configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub clickhouse_url: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub clickhouse_database: Option<String>,
    pub nats_url: String,
    pub nats_log_topic: String,
    pub connect_retry: RetryPolicy,
}

impl ConsumerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            clickhouse_url: env::var("CLICKHOUSE_URL")
                .unwrap_or_else(|_| "http://localhost:8123".to_string()),
            clickhouse_user: env::var("CLICKHOUSE_USER").ok(),
            clickhouse_password: env::var("CLICKHOUSE_PASSWORD").ok(),
            clickhouse_database: env::var("CLICKHOUSE_DATABASE").ok(),
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| DEFAULT_NATS_URL.to_string()),
            nats_log_topic: env::var("NATS_LOG_TOPIC")
                .unwrap_or_else(|_| DEFAULT_LOG_TOPIC.to_string()),
            connect_retry: RetryPolicy::startup(),
        })
    }
}
