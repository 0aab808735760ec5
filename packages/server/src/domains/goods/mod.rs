//! Goods domain: project-scoped, priority-ranked goods.
//!
//! - `models` - `Good` and its Postgres queries (including reprioritize)
//! - `store` - `GoodStore` seam over the queries
//! - `cache` - read-through cache of list pages
//! - `events` - change events published to NATS
//! - `service` - orchestrates store, cache and events per operation

pub mod cache;
pub mod errors;
pub mod events;
pub mod models;
pub mod service;
pub mod store;
pub mod testing;

pub use cache::GoodsCache;
pub use errors::{GoodsError, GoodsResult};
pub use events::{GoodAction, GoodEvent, GoodEventPublisher};
pub use models::{Good, GoodChanges, GoodsPage, NewGood};
pub use service::GoodsService;
pub use store::{GoodStore, PostgresGoodStore};
