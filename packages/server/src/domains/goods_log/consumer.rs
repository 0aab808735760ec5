//! NATS subscription feeding the goods log batcher.
//!
//! On shutdown the subscription is stopped first, then the flush timer,
//! which writes whatever is still buffered before returning.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domains::goods::GoodEvent;
use crate::domains::goods_log::batcher::EventBatcher;
use crate::kernel::Service;

pub struct GoodsLogConsumer {
    client: async_nats::Client,
    subject: String,
    batcher: Arc<EventBatcher>,
}

impl GoodsLogConsumer {
    pub fn new(
        client: async_nats::Client,
        subject: impl Into<String>,
        batcher: Arc<EventBatcher>,
    ) -> Self {
        Self {
            client,
            subject: subject.into(),
            batcher,
        }
    }
}

#[async_trait]
impl Service for GoodsLogConsumer {
    fn name(&self) -> &'static str {
        "goods-log-consumer"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "subscribed to goods events");

        let payloads = (&mut subscriber).map(|message| message.payload);
        consume(&self.batcher, payloads, shutdown).await;

        if let Err(e) = subscriber.unsubscribe().await {
            warn!(error = %e, "failed to unsubscribe from goods events");
        }
        Ok(())
    }
}

/// Buffer events from `payloads` while a flush timer runs alongside.
///
/// Returns once `shutdown` is cancelled or the stream ends, after the
/// final flush.
pub async fn consume<S>(batcher: &Arc<EventBatcher>, payloads: S, shutdown: CancellationToken)
where
    S: Stream<Item = Bytes> + Unpin,
{
    let timer_shutdown = CancellationToken::new();
    let timer = tokio::spawn(batcher.clone().run_flush_loop(timer_shutdown.clone()));

    let mut payloads = payloads;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = payloads.next() => match next {
                Some(payload) => accept(batcher, &payload).await,
                None => {
                    warn!("goods event stream closed");
                    break;
                }
            },
        }
    }

    timer_shutdown.cancel();
    if let Err(e) = timer.await {
        warn!(error = %e, "goods log flush task panicked");
    }
}

async fn accept(batcher: &EventBatcher, payload: &[u8]) {
    match GoodEvent::from_payload(payload) {
        Ok(event) => {
            debug!(good_id = %event.id, action = %event.action, "buffered goods event");
            batcher.add(event).await;
        }
        Err(e) => warn!(
            error = %e,
            payload = %String::from_utf8_lossy(payload),
            "discarding malformed goods event"
        ),
    }
}
