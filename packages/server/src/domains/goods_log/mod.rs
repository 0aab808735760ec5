//! Goods event log: NATS consumer that batches goods events into ClickHouse.
//!
//! ```text
//! NATS subject ─► GoodsLogConsumer ─► EventBatcher (buffer) ─► every 5s ─► GoodsLogStore batch
//! ```

pub mod batcher;
pub mod consumer;
pub mod store;
pub mod testing;

pub use batcher::{BatcherConfig, EventBatcher, FlushOutcome};
pub use consumer::GoodsLogConsumer;
pub use store::{ClickHouseGoodsLog, GoodsLogBatch, GoodsLogRow, GoodsLogStore};
