//! Item store seam for the goods orchestrator.
//!
//! `PostgresGoodStore` delegates to the `Good` model queries; tests use
//! `InMemoryGoodStore` from the `testing` module.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{GoodId, ListQuery, ProjectId};
use crate::domains::goods::errors::GoodsResult;
use crate::domains::goods::models::{Good, GoodChanges, GoodsPage, NewGood};

#[async_trait]
pub trait GoodStore: Send + Sync {
    /// Persist a good at the project's current max priority + 1
    async fn create(&self, new: NewGood) -> GoodsResult<Good>;

    /// Fetch an active good
    async fn find_by_id(&self, id: GoodId) -> GoodsResult<Good>;

    /// Replace name/description of an active good under a row lock
    async fn update(
        &self,
        id: GoodId,
        project_id: ProjectId,
        changes: &GoodChanges,
    ) -> GoodsResult<Good>;

    /// Soft-delete an active good, returning the removed row
    async fn delete(&self, id: GoodId, project_id: ProjectId) -> GoodsResult<Good>;

    /// Page of active goods plus project-wide counters
    async fn list(&self, query: &ListQuery) -> GoodsResult<GoodsPage>;

    /// Highest assigned priority, 0 for a project without goods
    async fn max_priority(&self, project_id: ProjectId) -> GoodsResult<i32>;

    /// Move a good to `new_priority`, returning active goods ranked at or after it
    async fn reprioritize(
        &self,
        id: GoodId,
        project_id: ProjectId,
        new_priority: i32,
    ) -> GoodsResult<Vec<Good>>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PostgresGoodStore {
    pool: PgPool,
}

impl PostgresGoodStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoodStore for PostgresGoodStore {
    async fn create(&self, new: NewGood) -> GoodsResult<Good> {
        Good::create(&new, &self.pool).await
    }

    async fn find_by_id(&self, id: GoodId) -> GoodsResult<Good> {
        Good::find_by_id(id, &self.pool).await
    }

    async fn update(
        &self,
        id: GoodId,
        project_id: ProjectId,
        changes: &GoodChanges,
    ) -> GoodsResult<Good> {
        Good::update(id, project_id, changes, &self.pool).await
    }

    async fn delete(&self, id: GoodId, project_id: ProjectId) -> GoodsResult<Good> {
        Good::soft_delete(id, project_id, &self.pool).await
    }

    async fn list(&self, query: &ListQuery) -> GoodsResult<GoodsPage> {
        Good::list(query, &self.pool).await
    }

    async fn max_priority(&self, project_id: ProjectId) -> GoodsResult<i32> {
        Good::max_priority(project_id, &self.pool).await
    }

    async fn reprioritize(
        &self,
        id: GoodId,
        project_id: ProjectId,
        new_priority: i32,
    ) -> GoodsResult<Vec<Good>> {
        Good::reprioritize(id, project_id, new_priority, &self.pool).await
    }
}
