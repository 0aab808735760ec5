// TestDependencies - mock implementations for testing
//
// In-memory stand-ins for Redis and NATS that can be injected into the goods
// service. They record calls so tests can assert on cache and event traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use super::{BaseCache, NatsPublisher, TestNats};

// =============================================================================
// Test Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
    expires_at: Instant,
}

/// In-memory cache with TTL expiry and a switch to simulate an outage.
#[derive(Default)]
pub struct TestCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    invalidated_prefixes: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl TestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail like an unreachable Redis.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Keys currently held (expired entries included until read).
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// TTL the key was stored with.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|e| e.ttl)
    }

    /// Overwrite a stored value without touching its TTL.
    pub fn corrupt(&self, key: &str, value: &str) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.value = value.to_string();
        }
    }

    /// Every prefix passed to `delete_prefix`, in call order.
    pub fn invalidated_prefixes(&self) -> Vec<String> {
        self.invalidated_prefixes.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(anyhow!("cache unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BaseCache for TestCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.check_available()?;
        self.invalidated_prefixes
            .lock()
            .unwrap()
            .push(prefix.to_string());
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Failing NATS
// =============================================================================

/// Publisher whose broker is always unreachable.
#[derive(Default)]
pub struct FailingNats;

#[async_trait]
impl NatsPublisher for FailingNats {
    async fn publish(&self, _subject: String, _payload: Bytes) -> Result<()> {
        Err(anyhow!("nats: connection closed"))
    }

    fn is_connected(&self) -> bool {
        false
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Bundle of recording doubles, cloned into whatever is under test.
#[derive(Clone, Default)]
pub struct TestDependencies {
    pub cache: Arc<TestCache>,
    pub nats: Arc<TestNats>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::default()
    }
}
