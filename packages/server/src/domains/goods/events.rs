//! Goods change events and their best-effort publisher.
//!
//! Every committed mutation emits one `GoodEvent` to the NATS log subject.
//! The event stream is an audit side channel: a failed publish is logged
//! and never fails or delays the mutation that produced it.
//!
//! Wire format (JSON):
//!
//! ```json
//! {"id": 7, "project_id": 42, "action": "reprioritized", "timestamp": "2024-06-01T12:00:00Z"}
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::{GoodId, ProjectId};
use crate::kernel::NatsPublisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoodAction {
    Created,
    Updated,
    Deleted,
    Reprioritized,
}

impl GoodAction {
    pub fn as_str(self) -> &'static str {
        match self {
            GoodAction::Created => "created",
            GoodAction::Updated => "updated",
            GoodAction::Deleted => "deleted",
            GoodAction::Reprioritized => "reprioritized",
        }
    }
}

impl fmt::Display for GoodAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodEvent {
    pub id: GoodId,
    pub project_id: ProjectId,
    pub action: GoodAction,
    pub timestamp: DateTime<Utc>,
}

impl GoodEvent {
    pub fn new(id: GoodId, project_id: ProjectId, action: GoodAction) -> Self {
        Self {
            id,
            project_id,
            action,
            timestamp: Utc::now(),
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Fire-and-forget publisher for goods events.
#[derive(Clone)]
pub struct GoodEventPublisher {
    nats: Arc<dyn NatsPublisher>,
    subject: String,
}

impl GoodEventPublisher {
    pub fn new(nats: Arc<dyn NatsPublisher>, subject: impl Into<String>) -> Self {
        Self {
            nats,
            subject: subject.into(),
        }
    }

    pub async fn publish(&self, event: GoodEvent) {
        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(good_id = %event.id, error = %e, "failed to encode goods event");
                return;
            }
        };

        match self.nats.publish(self.subject.clone(), payload).await {
            Ok(()) => debug!(
                good_id = %event.id,
                project_id = %event.project_id,
                action = %event.action,
                "published goods event"
            ),
            Err(e) => warn!(
                good_id = %event.id,
                project_id = %event.project_id,
                action = %event.action,
                error = %e,
                "failed to publish goods event"
            ),
        }
    }
}
