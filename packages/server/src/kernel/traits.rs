// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Key layout, TTL policy and serialization of cached values belong to the
// domain code that uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseCache)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Cache Trait (Infrastructure - key/value with TTL)
// =============================================================================

#[async_trait]
pub trait BaseCache: Send + Sync {
    /// Fetch a value, `None` on a miss
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Round trip to the backing store
    async fn ping(&self) -> Result<()>;

    /// Short name of the backing store, reported by `/health`
    fn backend(&self) -> &'static str;
}

/// Cache that never stores anything.
///
/// Used when Redis is unreachable at startup: every read becomes a miss and
/// is served from Postgres.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl BaseCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
        Ok(0)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
