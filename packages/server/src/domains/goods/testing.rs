//! In-memory `GoodStore` for orchestrator tests.
//!
//! Mirrors the Postgres semantics: soft delete, project-scoped ranking and
//! the shift-then-set reprioritize. A single mutex stands in for row locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::common::{GoodId, ListQuery, ProjectId, SortDirection};
use crate::domains::goods::errors::{GoodsError, GoodsResult};
use crate::domains::goods::models::{next_priority, Good, GoodChanges, GoodsPage, NewGood};
use crate::domains::goods::store::GoodStore;

#[derive(Default)]
struct State {
    next_id: i64,
    goods: Vec<Good>,
}

#[derive(Default)]
pub struct InMemoryGoodStore {
    state: Mutex<State>,
    failing: AtomicBool,
}

impl InMemoryGoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail like a lost database connection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a good with an explicit priority, bypassing rank assignment.
    pub fn insert_with_priority(&self, project_id: ProjectId, name: &str, priority: i32) -> Good {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let good = Good {
            id: GoodId::new(state.next_id),
            project_id,
            name: name.to_string(),
            description: String::new(),
            priority,
            removed: false,
            created_at: Utc::now(),
        };
        state.goods.push(good.clone());
        good
    }

    /// Every good of the project, removed included, ordered by id.
    pub fn snapshot(&self, project_id: ProjectId) -> Vec<Good> {
        let state = self.state.lock().unwrap();
        let mut goods: Vec<Good> = state
            .goods
            .iter()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        goods.sort_by_key(|g| g.id);
        goods
    }

    fn check_available(&self) -> GoodsResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GoodsError::Persistence(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

fn max_priority_of(state: &State, project_id: ProjectId) -> i32 {
    state
        .goods
        .iter()
        .filter(|g| g.project_id == project_id)
        .map(|g| g.priority)
        .max()
        .unwrap_or(0)
}

#[async_trait]
impl GoodStore for InMemoryGoodStore {
    async fn create(&self, new: NewGood) -> GoodsResult<Good> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let priority = next_priority(max_priority_of(&state, new.project_id))?;
        state.next_id += 1;
        let good = Good {
            id: GoodId::new(state.next_id),
            project_id: new.project_id,
            name: new.name,
            description: new.description,
            priority,
            removed: false,
            created_at: Utc::now(),
        };
        state.goods.push(good.clone());
        Ok(good)
    }

    async fn find_by_id(&self, id: GoodId) -> GoodsResult<Good> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        state
            .goods
            .iter()
            .find(|g| g.id == id && !g.removed)
            .cloned()
            .ok_or(GoodsError::NotFound)
    }

    async fn update(
        &self,
        id: GoodId,
        project_id: ProjectId,
        changes: &GoodChanges,
    ) -> GoodsResult<Good> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let good = state
            .goods
            .iter_mut()
            .find(|g| g.id == id && g.project_id == project_id && !g.removed)
            .ok_or(GoodsError::NotFound)?;
        good.name = changes.name.clone();
        good.description = changes.description.clone();
        Ok(good.clone())
    }

    async fn delete(&self, id: GoodId, project_id: ProjectId) -> GoodsResult<Good> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let good = state
            .goods
            .iter_mut()
            .find(|g| g.id == id && g.project_id == project_id && !g.removed)
            .ok_or(GoodsError::NotFound)?;
        good.removed = true;
        Ok(good.clone())
    }

    async fn list(&self, query: &ListQuery) -> GoodsResult<GoodsPage> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let owned: Vec<&Good> = state
            .goods
            .iter()
            .filter(|g| g.project_id == query.project_id)
            .collect();
        let total = owned.len() as i64;
        let removed = owned.iter().filter(|g| g.removed).count() as i64;

        let mut active: Vec<Good> = owned.into_iter().filter(|g| !g.removed).cloned().collect();
        active.sort_by_key(|g| (g.created_at, g.id));
        if query.sort == SortDirection::Desc {
            active.reverse();
        }
        let goods = active
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();

        Ok(GoodsPage {
            goods,
            total,
            removed,
        })
    }

    async fn max_priority(&self, project_id: ProjectId) -> GoodsResult<i32> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(max_priority_of(&state, project_id))
    }

    async fn reprioritize(
        &self,
        id: GoodId,
        project_id: ProjectId,
        new_priority: i32,
    ) -> GoodsResult<Vec<Good>> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let current = state
            .goods
            .iter()
            .find(|g| g.id == id && g.project_id == project_id && !g.removed)
            .map(|g| g.priority)
            .ok_or(GoodsError::NotFound)?;

        if current != new_priority {
            for good in state.goods.iter_mut() {
                if good.project_id != project_id || good.removed {
                    continue;
                }
                if good.id == id {
                    good.priority = new_priority;
                } else if good.priority >= new_priority {
                    good.priority += 1;
                }
            }
        }

        let mut affected: Vec<Good> = state
            .goods
            .iter()
            .filter(|g| g.project_id == project_id && !g.removed && g.priority >= new_priority)
            .cloned()
            .collect();
        affected.sort_by_key(|g| (g.priority, g.id));
        Ok(affected)
    }
}
