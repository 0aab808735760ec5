//! Recording `GoodsLogStore` for batcher and consumer tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::common::GoodId;
use crate::domains::goods::GoodEvent;
use crate::domains::goods_log::store::{GoodsLogBatch, GoodsLogStore};

#[derive(Default)]
struct Recorded {
    committed: Vec<GoodEvent>,
    batches_begun: usize,
    fail_begin: bool,
    fail_commit: bool,
    failing_ids: HashSet<GoodId>,
}

/// Keeps committed events in memory; individual steps can be made to fail.
#[derive(Clone, Default)]
pub struct RecordingGoodsLog {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingGoodsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_begin(&self, fail: bool) {
        self.inner.lock().unwrap().fail_begin = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.inner.lock().unwrap().fail_commit = fail;
    }

    /// Reject inserts of this good's events.
    pub fn fail_insert_for(&self, id: GoodId) {
        self.inner.lock().unwrap().failing_ids.insert(id);
    }

    pub fn committed(&self) -> Vec<GoodEvent> {
        self.inner.lock().unwrap().committed.clone()
    }

    pub fn batches_begun(&self) -> usize {
        self.inner.lock().unwrap().batches_begun
    }
}

#[async_trait]
impl GoodsLogStore for RecordingGoodsLog {
    async fn begin_batch(&self) -> Result<Box<dyn GoodsLogBatch>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_begin {
            return Err(anyhow!("goods_log unavailable"));
        }
        inner.batches_begun += 1;
        Ok(Box::new(RecordingBatch {
            log: self.clone(),
            rows: Vec::new(),
        }))
    }
}

struct RecordingBatch {
    log: RecordingGoodsLog,
    rows: Vec<GoodEvent>,
}

#[async_trait]
impl GoodsLogBatch for RecordingBatch {
    async fn insert(&mut self, event: &GoodEvent) -> Result<()> {
        if self.log.inner.lock().unwrap().failing_ids.contains(&event.id) {
            return Err(anyhow!("insert rejected for good {}", event.id));
        }
        self.rows.push(event.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut inner = self.log.inner.lock().unwrap();
        if inner.fail_commit {
            return Err(anyhow!("commit failed"));
        }
        inner.committed.extend(self.rows);
        Ok(())
    }
}
