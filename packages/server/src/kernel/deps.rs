//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container the HTTP layer
//! builds its services from. External services sit behind trait objects so
//! tests can swap in the doubles from `test_dependencies`.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::CACHE_TTL;
use crate::domains::goods::{GoodEventPublisher, GoodsCache, GoodsService, PostgresGoodStore};
use crate::kernel::{BaseCache, NatsPublisher};

/// Server dependencies shared by all request handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub cache: Arc<dyn BaseCache>,
    pub nats: Arc<dyn NatsPublisher>,
    /// Subject goods events are published to
    pub nats_log_topic: String,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        cache: Arc<dyn BaseCache>,
        nats: Arc<dyn NatsPublisher>,
        nats_log_topic: String,
    ) -> Self {
        Self {
            db_pool,
            cache,
            nats,
            nats_log_topic,
        }
    }

    /// Wire the goods orchestrator against Postgres, the cache and NATS.
    pub fn goods_service(&self) -> GoodsService {
        GoodsService::new(
            Arc::new(PostgresGoodStore::new(self.db_pool.clone())),
            GoodsCache::new(self.cache.clone(), CACHE_TTL),
            GoodEventPublisher::new(self.nats.clone(), self.nats_log_topic.clone()),
        )
    }
}
