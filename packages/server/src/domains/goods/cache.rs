//! Read-through cache for goods list pages.
//!
//! Keys fingerprint the whole page request:
//! `goods:project={project}:limit={limit}:offset={offset}:sort={sort}`.
//! Any write to a project drops every key under `goods:project={project}:`,
//! because each cached page of that project may now be stale.
//!
//! The cache is never authoritative. Backend errors and undecodable values
//! are logged and treated as misses; the store answers instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::common::{ListQuery, ProjectId};
use crate::domains::goods::models::GoodsPage;
use crate::kernel::BaseCache;

#[derive(Clone)]
pub struct GoodsCache {
    backend: Arc<dyn BaseCache>,
    ttl: Duration,
}

impl GoodsCache {
    pub fn new(backend: Arc<dyn BaseCache>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn page_key(query: &ListQuery) -> String {
        format!(
            "{}limit={}:offset={}:sort={}",
            Self::project_prefix(query.project_id),
            query.limit,
            query.offset,
            query.sort
        )
    }

    pub fn project_prefix(project_id: ProjectId) -> String {
        format!("goods:project={}:", project_id)
    }

    pub async fn get_page(&self, query: &ListQuery) -> Option<GoodsPage> {
        let key = Self::page_key(query);
        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(page) => {
                debug!(key = %key, "goods page served from cache");
                Some(page)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "discarding undecodable cached page");
                None
            }
        }
    }

    pub async fn put_page(&self, query: &ListQuery, page: &GoodsPage) {
        let key = Self::page_key(query);
        let raw = match serde_json::to_string(page) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode goods page for cache");
                return;
            }
        };

        if let Err(e) = self.backend.set(&key, &raw, self.ttl).await {
            warn!(key = %key, error = %e, "cache write failed");
        }
    }

    /// Drop every cached page of the project.
    pub async fn invalidate_project(&self, project_id: ProjectId) {
        let prefix = Self::project_prefix(project_id);
        match self.backend.delete_prefix(&prefix).await {
            Ok(deleted) => debug!(project_id = %project_id, deleted, "invalidated goods pages"),
            // Entries still expire after the TTL
            Err(e) => warn!(project_id = %project_id, error = %e, "cache invalidation failed"),
        }
    }
}
