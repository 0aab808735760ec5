// Goods API - Core
//
// Priority-ranked goods per project: Postgres store, Redis list cache,
// NATS change events and a ClickHouse event log fed by a batching consumer.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
