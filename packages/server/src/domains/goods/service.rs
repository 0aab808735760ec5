//! Goods orchestrator.
//!
//! Every write runs the same sequence:
//!
//! ```text
//! validate ─► store mutation (transaction) ─► invalidate project pages ─► publish event ─► return
//! ```
//!
//! Cache invalidation finishes before the caller sees the result, so a
//! following list for the project never returns pre-write data. Publishing
//! is best-effort and cannot fail the request.
//!
//! Lists read through the cache; single-good reads always hit the store.

use std::sync::Arc;

use tracing::{debug, info};

use crate::common::{GoodId, ListQuery, ProjectId};
use crate::domains::goods::cache::GoodsCache;
use crate::domains::goods::errors::{GoodsError, GoodsResult};
use crate::domains::goods::events::{GoodAction, GoodEvent, GoodEventPublisher};
use crate::domains::goods::models::{Good, GoodChanges, GoodsPage, NewGood};
use crate::domains::goods::store::GoodStore;

#[derive(Clone)]
pub struct GoodsService {
    store: Arc<dyn GoodStore>,
    cache: GoodsCache,
    events: GoodEventPublisher,
}

impl GoodsService {
    pub fn new(store: Arc<dyn GoodStore>, cache: GoodsCache, events: GoodEventPublisher) -> Self {
        Self {
            store,
            cache,
            events,
        }
    }

    pub async fn create(&self, project_id: ProjectId, name: String) -> GoodsResult<Good> {
        validate_project(project_id)?;
        validate_name(&name)?;

        let good = self
            .store
            .create(NewGood {
                project_id,
                name,
                description: String::new(),
            })
            .await?;
        info!(good_id = %good.id, project_id = %project_id, priority = good.priority, "good created");

        self.cache.invalidate_project(project_id).await;
        self.emit(&good, GoodAction::Created).await;
        Ok(good)
    }

    pub async fn get(&self, id: GoodId) -> GoodsResult<Good> {
        validate_id(id)?;
        self.store.find_by_id(id).await
    }

    pub async fn update(
        &self,
        id: GoodId,
        project_id: ProjectId,
        changes: GoodChanges,
    ) -> GoodsResult<Good> {
        validate_id(id)?;
        validate_project(project_id)?;
        validate_name(&changes.name)?;

        let good = self.store.update(id, project_id, &changes).await?;
        info!(good_id = %id, project_id = %project_id, "good updated");

        self.cache.invalidate_project(project_id).await;
        self.emit(&good, GoodAction::Updated).await;
        Ok(good)
    }

    pub async fn delete(&self, id: GoodId, project_id: ProjectId) -> GoodsResult<Good> {
        validate_id(id)?;
        validate_project(project_id)?;

        let good = self.store.delete(id, project_id).await?;
        info!(good_id = %id, project_id = %project_id, "good removed");

        self.cache.invalidate_project(project_id).await;
        self.emit(&good, GoodAction::Deleted).await;
        Ok(good)
    }

    pub async fn list(&self, query: ListQuery) -> GoodsResult<GoodsPage> {
        if let Some(reason) = query.validation_error() {
            return Err(GoodsError::validation(reason));
        }

        if let Some(page) = self.cache.get_page(&query).await {
            return Ok(page);
        }

        let page = self.store.list(&query).await?;
        debug!(
            project_id = %query.project_id,
            returned = page.goods.len(),
            total = page.total,
            "goods page loaded from store"
        );
        self.cache.put_page(&query, &page).await;
        Ok(page)
    }

    /// Move a good to `new_priority`, returning the active goods ranked at or after it.
    pub async fn reprioritize(
        &self,
        id: GoodId,
        project_id: ProjectId,
        new_priority: i32,
    ) -> GoodsResult<Vec<Good>> {
        validate_id(id)?;
        validate_project(project_id)?;
        if new_priority < 1 {
            return Err(GoodsError::validation("invalid priority"));
        }

        let affected = self.store.reprioritize(id, project_id, new_priority).await?;
        info!(
            good_id = %id,
            project_id = %project_id,
            new_priority,
            affected = affected.len(),
            "good reprioritized"
        );

        self.cache.invalidate_project(project_id).await;
        self.events
            .publish(GoodEvent::new(id, project_id, GoodAction::Reprioritized))
            .await;
        Ok(affected)
    }

    async fn emit(&self, good: &Good, action: GoodAction) {
        self.events
            .publish(GoodEvent::new(good.id, good.project_id, action))
            .await;
    }
}

fn validate_name(name: &str) -> GoodsResult<()> {
    if name.is_empty() {
        return Err(GoodsError::validation("name is required"));
    }
    Ok(())
}

fn validate_id(id: GoodId) -> GoodsResult<()> {
    if !id.is_valid() {
        return Err(GoodsError::validation("invalid id"));
    }
    Ok(())
}

fn validate_project(project_id: ProjectId) -> GoodsResult<()> {
    if !project_id.is_valid() {
        return Err(GoodsError::validation("invalid project id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SortDirection;
    use crate::domains::goods::testing::InMemoryGoodStore;
    use crate::kernel::{FailingNats, TestCache, TestNats};
    use std::time::Duration;

    const SUBJECT: &str = "goods.log";

    struct Fixture {
        service: GoodsService,
        store: Arc<InMemoryGoodStore>,
        cache: Arc<TestCache>,
        nats: Arc<TestNats>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryGoodStore::new());
        let cache = Arc::new(TestCache::new());
        let nats = Arc::new(TestNats::new());
        let service = GoodsService::new(
            store.clone(),
            GoodsCache::new(cache.clone(), Duration::from_secs(60)),
            GoodEventPublisher::new(nats.clone(), SUBJECT),
        );
        Fixture {
            service,
            store,
            cache,
            nats,
        }
    }

    fn published_actions(nats: &TestNats) -> Vec<GoodAction> {
        nats.messages_for_subject(SUBJECT)
            .iter()
            .map(|m| nats.deserialize_message::<GoodEvent>(m).unwrap().action)
            .collect()
    }

    fn priorities(goods: &[Good]) -> Vec<(i64, i32)> {
        goods.iter().map(|g| (g.id.get(), g.priority)).collect()
    }

    #[tokio::test]
    async fn test_create_assigns_next_priority() {
        let f = fixture();
        let project = ProjectId::new(1);

        let first = f.service.create(project, "Desk".into()).await.unwrap();
        let second = f.service.create(project, "Lamp".into()).await.unwrap();
        let elsewhere = f
            .service
            .create(ProjectId::new(2), "Rug".into())
            .await
            .unwrap();

        assert_eq!(first.priority, 1);
        assert_eq!(second.priority, 2);
        assert_eq!(elsewhere.priority, 1);
        assert_eq!(
            published_actions(&f.nats),
            vec![GoodAction::Created, GoodAction::Created, GoodAction::Created]
        );
    }

    #[tokio::test]
    async fn test_create_follows_previous_max_even_with_gaps() {
        let f = fixture();
        let project = ProjectId::new(1);
        f.store.insert_with_priority(project, "a", 7);

        let created = f.service.create(project, "b".into()).await.unwrap();
        assert_eq!(created.priority, 8);
    }

    #[tokio::test]
    async fn test_empty_name_is_a_validation_error() {
        let f = fixture();

        let err = f
            .service
            .create(ProjectId::new(1), "".into())
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::Validation(_)));

        let good = f.service.create(ProjectId::new(1), "Desk".into()).await.unwrap();
        let err = f
            .service
            .update(
                good.id,
                good.project_id,
                GoodChanges {
                    name: String::new(),
                    description: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::Validation(_)));

        // Nothing was published for rejected input
        assert_eq!(published_actions(&f.nats), vec![GoodAction::Created]);
    }

    #[tokio::test]
    async fn test_whitespace_name_is_kept_verbatim() {
        let f = fixture();

        let good = f.service.create(ProjectId::new(1), "  ".into()).await.unwrap();

        assert_eq!(good.name, "  ");
        assert_eq!(published_actions(&f.nats), vec![GoodAction::Created]);
    }

    #[tokio::test]
    async fn test_get_skips_removed_goods() {
        let f = fixture();
        let good = f.service.create(ProjectId::new(1), "Desk".into()).await.unwrap();

        assert_eq!(f.service.get(good.id).await.unwrap().name, "Desk");
        f.service.delete(good.id, good.project_id).await.unwrap();
        assert!(matches!(
            f.service.get(good.id).await,
            Err(GoodsError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_preserves_rank_and_owner() {
        let f = fixture();
        let project = ProjectId::new(3);
        f.service.create(project, "first".into()).await.unwrap();
        let good = f.service.create(project, "second".into()).await.unwrap();

        let updated = f
            .service
            .update(
                good.id,
                project,
                GoodChanges {
                    name: "renamed".into(),
                    description: "now with notes".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.description, "now with notes");
        assert_eq!(updated.priority, 2);
        assert_eq!(updated.project_id, project);
        assert_eq!(updated.created_at, good.created_at);
    }

    #[tokio::test]
    async fn test_update_scoped_to_project() {
        let f = fixture();
        let good = f.service.create(ProjectId::new(1), "Desk".into()).await.unwrap();

        let err = f
            .service
            .update(
                good.id,
                ProjectId::new(2),
                GoodChanges {
                    name: "Stolen".into(),
                    description: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::NotFound));
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let f = fixture();
        let good = f.service.create(ProjectId::new(1), "Desk".into()).await.unwrap();

        let removed = f.service.delete(good.id, good.project_id).await.unwrap();
        assert!(removed.removed);

        let err = f.service.delete(good.id, good.project_id).await.unwrap_err();
        assert!(matches!(err, GoodsError::NotFound));

        let page = f
            .service
            .list(ListQuery::first_page(good.project_id))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.removed, 1);
        assert_eq!(
            published_actions(&f.nats),
            vec![GoodAction::Created, GoodAction::Deleted]
        );
    }

    #[tokio::test]
    async fn test_list_is_served_from_cache_until_a_write() {
        let f = fixture();
        let project = ProjectId::new(1);
        let good = f.service.create(project, "Desk".into()).await.unwrap();
        let query = ListQuery::first_page(project);

        let first = f.service.list(query).await.unwrap();
        assert!(f.cache.contains(&GoodsCache::page_key(&query)));

        // A store outage is invisible while the page is cached
        f.store.set_failing(true);
        assert_eq!(f.service.list(query).await.unwrap(), first);
        f.store.set_failing(false);

        f.service
            .update(
                good.id,
                project,
                GoodChanges {
                    name: "Standing desk".into(),
                    description: String::new(),
                },
            )
            .await
            .unwrap();

        let after = f.service.list(query).await.unwrap();
        assert_eq!(after.goods[0].name, "Standing desk");
    }

    #[tokio::test]
    async fn test_every_write_invalidates_project_pages() {
        let f = fixture();
        let project = ProjectId::new(9);
        let prefix = GoodsCache::project_prefix(project);

        let good = f.service.create(project, "a".into()).await.unwrap();
        f.service
            .update(
                good.id,
                project,
                GoodChanges {
                    name: "b".into(),
                    description: String::new(),
                },
            )
            .await
            .unwrap();
        f.service.reprioritize(good.id, project, 1).await.unwrap();
        f.service.delete(good.id, project).await.unwrap();

        assert_eq!(f.cache.invalidated_prefixes(), vec![prefix; 4]);
    }

    #[tokio::test]
    async fn test_created_good_appears_in_cached_list() {
        let f = fixture();
        let project = ProjectId::new(5);
        let query = ListQuery::first_page(project);
        f.service.create(project, "a".into()).await.unwrap();
        assert_eq!(f.service.list(query).await.unwrap().goods.len(), 1);

        f.service.create(project, "b".into()).await.unwrap();
        assert_eq!(f.service.list(query).await.unwrap().goods.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_alone() {
        let f = fixture();
        let project = ProjectId::new(1);
        f.service.list(ListQuery::first_page(project)).await.unwrap();

        let err = f.service.delete(GoodId::new(99), project).await.unwrap_err();
        assert!(matches!(err, GoodsError::NotFound));
        assert!(f.cache.invalidated_prefixes().is_empty());
        assert_eq!(f.nats.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_list_counts_ignore_page_window() {
        let f = fixture();
        let project = ProjectId::new(42);
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d", "e"] {
            ids.push(f.service.create(project, name.into()).await.unwrap().id);
        }
        f.service.delete(ids[1], project).await.unwrap();
        f.service.delete(ids[3], project).await.unwrap();

        let page = f
            .service
            .list(ListQuery::new(project, 2, 0, SortDirection::Desc))
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.removed, 2);
        assert_eq!(
            page.goods.iter().map(|g| g.id).collect::<Vec<_>>(),
            vec![ids[4], ids[2]]
        );
        assert!(page.goods.iter().all(|g| !g.removed));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_window() {
        let f = fixture();
        let err = f
            .service
            .list(ListQuery::new(ProjectId::new(1), 0, 0, SortDirection::Asc))
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reprioritize_shifts_suffix() {
        let f = fixture();
        let project = ProjectId::new(1);
        let one = f.store.insert_with_priority(project, "one", 1);
        let two = f.store.insert_with_priority(project, "two", 2);
        let target = f.store.insert_with_priority(project, "target", 3);
        let four = f.store.insert_with_priority(project, "four", 4);

        let affected = f.service.reprioritize(target.id, project, 1).await.unwrap();

        assert_eq!(
            priorities(&affected),
            vec![
                (target.id.get(), 1),
                (one.id.get(), 2),
                (two.id.get(), 3),
                (four.id.get(), 5),
            ]
        );
        assert_eq!(published_actions(&f.nats), vec![GoodAction::Reprioritized]);
    }

    #[tokio::test]
    async fn test_reprioritize_to_current_priority_changes_nothing() {
        let f = fixture();
        let project = ProjectId::new(1);
        for (name, priority) in [("a", 1), ("b", 2), ("c", 3)] {
            f.store.insert_with_priority(project, name, priority);
        }
        let before = f.store.snapshot(project);

        let affected = f
            .service
            .reprioritize(before[1].id, project, 2)
            .await
            .unwrap();

        assert_eq!(f.store.snapshot(project), before);
        assert_eq!(priorities(&affected), priorities(&before[1..]));
    }

    #[tokio::test]
    async fn test_reprioritize_beyond_max_is_not_clamped() {
        let f = fixture();
        let project = ProjectId::new(1);
        let a = f.store.insert_with_priority(project, "a", 1);
        f.store.insert_with_priority(project, "b", 2);

        let affected = f.service.reprioritize(a.id, project, 10).await.unwrap();
        assert_eq!(priorities(&affected), vec![(a.id.get(), 10)]);
    }

    #[tokio::test]
    async fn test_reprioritize_rejects_non_positive_priority() {
        let f = fixture();
        let good = f.service.create(ProjectId::new(1), "a".into()).await.unwrap();
        let err = f
            .service
            .reprioritize(good.id, good.project_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reprioritize_removed_good_is_not_found() {
        let f = fixture();
        let good = f.service.create(ProjectId::new(1), "a".into()).await.unwrap();
        f.service.delete(good.id, good.project_id).await.unwrap();

        let err = f
            .service
            .reprioritize(good.id, good.project_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::NotFound));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_mutation() {
        let store = Arc::new(InMemoryGoodStore::new());
        let service = GoodsService::new(
            store.clone(),
            GoodsCache::new(Arc::new(TestCache::new()), Duration::from_secs(60)),
            GoodEventPublisher::new(Arc::new(FailingNats), SUBJECT),
        );

        let good = service.create(ProjectId::new(1), "Desk".into()).await.unwrap();
        service.delete(good.id, good.project_id).await.unwrap();
        assert!(store.snapshot(ProjectId::new(1))[0].removed);
    }

    #[tokio::test]
    async fn test_cache_outage_falls_back_to_store() {
        let f = fixture();
        let project = ProjectId::new(1);
        f.service.create(project, "Desk".into()).await.unwrap();
        f.cache.set_failing(true);

        let page = f.service.list(ListQuery::first_page(project)).await.unwrap();
        assert_eq!(page.goods.len(), 1);

        // Writes still succeed without invalidation
        f.service.create(project, "Lamp".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let f = fixture();
        f.store.set_failing(true);

        let err = f
            .service
            .create(ProjectId::new(1), "Desk".into())
            .await
            .unwrap_err();
        assert!(matches!(err, GoodsError::Persistence(_)));
        assert_eq!(f.nats.publish_count(), 0);
    }
}
