//! Buffered, timer-driven writer of goods events.
//!
//! Events are appended by the NATS consumer and written by the flush timer.
//! Both take the same lock, so an append never interleaves with a flush.
//!
//! Flush semantics:
//! - empty buffer: nothing happens
//! - begin fails: events stay buffered for the next tick
//! - an insert fails: logged, the rest of the batch continues
//! - commit fails: the batch is dropped and logged
//! - commit succeeds: the buffer is cleared

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::FLUSH_INTERVAL;
use crate::domains::goods::GoodEvent;
use crate::domains::goods_log::store::GoodsLogStore;

/// Oldest events are dropped once this many are waiting.
pub const DEFAULT_MAX_BUFFERED: usize = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    pub flush_interval: Duration,
    pub max_buffered: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            flush_interval: FLUSH_INTERVAL,
            max_buffered: DEFAULT_MAX_BUFFERED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Empty,
    /// Batch committed; `failed` events were rejected individually.
    Flushed { inserted: usize, failed: usize },
    /// The batch could not be opened; events remain buffered.
    Deferred { pending: usize },
    /// Commit failed; the batch is lost.
    Dropped { lost: usize },
}

pub struct EventBatcher {
    store: Arc<dyn GoodsLogStore>,
    buffer: Mutex<VecDeque<GoodEvent>>,
    config: BatcherConfig,
}

impl EventBatcher {
    pub fn new(store: Arc<dyn GoodsLogStore>, config: BatcherConfig) -> Self {
        Self {
            store,
            buffer: Mutex::new(VecDeque::new()),
            config,
        }
    }

    pub fn config(&self) -> BatcherConfig {
        self.config
    }

    pub async fn add(&self, event: GoodEvent) {
        let mut buffer = self.buffer.lock().await;
        if buffer.len() >= self.config.max_buffered {
            if let Some(dropped) = buffer.pop_front() {
                warn!(
                    good_id = %dropped.id,
                    action = %dropped.action,
                    max_buffered = self.config.max_buffered,
                    "goods log buffer full, dropping oldest event"
                );
            }
        }
        buffer.push_back(event);
    }

    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Write all buffered events as one batch.
    pub async fn flush(&self) -> FlushOutcome {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return FlushOutcome::Empty;
        }

        let mut batch = match self.store.begin_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                error!(pending = buffer.len(), error = %e, "failed to begin goods log batch");
                return FlushOutcome::Deferred {
                    pending: buffer.len(),
                };
            }
        };

        let mut inserted = 0;
        let mut failed = 0;
        for event in buffer.iter() {
            match batch.insert(event).await {
                Ok(()) => inserted += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        good_id = %event.id,
                        project_id = %event.project_id,
                        action = %event.action,
                        error = %e,
                        "failed to insert goods log event"
                    );
                }
            }
        }

        let outcome = match batch.commit().await {
            Ok(()) => {
                debug!(inserted, failed, "goods log batch committed");
                FlushOutcome::Flushed { inserted, failed }
            }
            Err(e) => {
                error!(lost = buffer.len(), error = %e, "failed to commit goods log batch");
                FlushOutcome::Dropped { lost: buffer.len() }
            }
        };
        buffer.clear();
        outcome
    }

    /// Flush every `flush_interval` until cancelled, then flush once more.
    pub async fn run_flush_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        let outcome = self.flush().await;
        info!(?outcome, "goods log final flush");
    }
}
