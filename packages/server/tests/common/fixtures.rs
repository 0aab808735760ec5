//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use goods_core::common::ProjectId;
use goods_core::domains::goods::{Good, NewGood};
use sqlx::PgPool;

/// Projects below this are reserved for tests that need a fixed id.
static NEXT_PROJECT: AtomicI64 = AtomicI64::new(1_000);

/// A project id no other test in this binary uses.
pub fn unique_project() -> ProjectId {
    ProjectId::new(NEXT_PROJECT.fetch_add(1, Ordering::SeqCst))
}

/// Create a good through the regular create path (priority = max + 1).
pub async fn create_test_good(pool: &PgPool, project_id: ProjectId, name: &str) -> Result<Good> {
    let good = Good::create(
        &NewGood {
            project_id,
            name: name.to_string(),
            description: String::new(),
        },
        pool,
    )
    .await?;
    Ok(good)
}

/// Insert a good with an explicit priority.
pub async fn insert_good_with_priority(
    pool: &PgPool,
    project_id: ProjectId,
    name: &str,
    priority: i32,
) -> Result<Good> {
    let good = sqlx::query_as::<_, Good>(
        r#"
        INSERT INTO goods (project_id, name, priority)
        VALUES ($1, $2, $3)
        RETURNING id, project_id, name, description, priority, removed, created_at
        "#,
    )
    .bind(project_id)
    .bind(name)
    .bind(priority)
    .fetch_one(pool)
    .await?;
    Ok(good)
}

/// Current (id, priority) of every active good in the project, by priority.
pub async fn active_priorities(pool: &PgPool, project_id: ProjectId) -> Result<Vec<(i64, i32)>> {
    let rows = sqlx::query_as::<_, (i64, i32)>(
        r#"
        SELECT id, priority FROM goods
        WHERE project_id = $1 AND removed = FALSE
        ORDER BY priority, id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Priorities held by more than one active good of the project, with counts.
pub async fn duplicate_active_priorities(
    pool: &PgPool,
    project_id: ProjectId,
) -> Result<Vec<(i32, i64)>> {
    let rows = sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT priority, COUNT(*) FROM goods
        WHERE project_id = $1 AND removed = FALSE
        GROUP BY priority
        HAVING COUNT(*) > 1
        ORDER BY priority
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
