//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod nats;
pub mod redis_cache;
pub mod service_host;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use nats::{NatsClientPublisher, NatsPublisher, PublishedMessage, TestNats};
pub use redis_cache::RedisCache;
pub use service_host::{shutdown_signal, Service, ServiceHost};
pub use test_dependencies::{FailingNats, TestCache, TestDependencies};
pub use traits::*;
