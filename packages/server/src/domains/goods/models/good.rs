use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::debug;

use crate::common::{GoodId, ListQuery, ProjectId, SortDirection};
use crate::domains::goods::errors::{GoodsError, GoodsResult};

/// A good owned by a project.
///
/// Within a project's active (non-removed) goods, `priority` is the display
/// rank. Removed goods stay in the table and no longer take part in ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Good {
    pub id: GoodId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub removed: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a good. Priority is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGood {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
}

/// Editable fields of a good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodChanges {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One page of a project's active goods plus project-wide counters.
///
/// `total` counts every good of the project, removed ones included;
/// `removed` counts only removed goods. Neither depends on the page window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsPage {
    pub goods: Vec<Good>,
    pub total: i64,
    pub removed: i64,
}

const GOOD_COLUMNS: &str = "id, project_id, name, description, priority, removed, created_at";

const LIST_ASC: &str = r#"
    SELECT id, project_id, name, description, priority, removed, created_at
    FROM goods
    WHERE project_id = $1 AND removed = FALSE
    ORDER BY created_at ASC, id ASC
    LIMIT $2 OFFSET $3
"#;

const LIST_DESC: &str = r#"
    SELECT id, project_id, name, description, priority, removed, created_at
    FROM goods
    WHERE project_id = $1 AND removed = FALSE
    ORDER BY created_at DESC, id DESC
    LIMIT $2 OFFSET $3
"#;

// =============================================================================
// Good Queries
// =============================================================================

impl Good {
    /// Insert a good ranked after every existing good of its project.
    ///
    /// Holds the project's rank lock, so it never reads a maximum that a
    /// concurrent create or reprioritize is about to change.
    pub async fn create(new: &NewGood, pool: &PgPool) -> GoodsResult<Self> {
        let mut tx = pool.begin().await?;

        lock_project_ranks(new.project_id, &mut *tx).await?;

        let priority = next_priority(Self::max_priority_with(new.project_id, &mut *tx).await?)?;

        let good = sqlx::query_as::<_, Self>(&format!(
            r#"
            INSERT INTO goods (project_id, name, description, priority, removed, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING {}
            "#,
            GOOD_COLUMNS
        ))
        .bind(new.project_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(priority)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(good)
    }

    /// Find an active good. Removed goods are reported as not found.
    pub async fn find_by_id(id: GoodId, pool: &PgPool) -> GoodsResult<Self> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM goods WHERE id = $1 AND removed = FALSE",
            GOOD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(GoodsError::NotFound)
    }

    /// Replace name and description of an active good.
    ///
    /// The row is locked first so a concurrent reprioritize of the same good
    /// waits for this transaction instead of reading a stale row.
    pub async fn update(
        id: GoodId,
        project_id: ProjectId,
        changes: &GoodChanges,
        pool: &PgPool,
    ) -> GoodsResult<Self> {
        let mut tx = pool.begin().await?;

        let locked: Option<GoodId> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM goods
            WHERE id = $1 AND project_id = $2 AND removed = FALSE
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *tx)
        .await?;

        if locked.is_none() {
            // Dropping the transaction rolls it back
            return Err(GoodsError::NotFound);
        }

        let good = sqlx::query_as::<_, Self>(&format!(
            r#"
            UPDATE goods
            SET name = $3, description = $4
            WHERE id = $1 AND project_id = $2
            RETURNING {}
            "#,
            GOOD_COLUMNS
        ))
        .bind(id)
        .bind(project_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(good)
    }

    /// Soft-delete an active good of a project, returning the removed row.
    ///
    /// Already-removed goods do not match, so a repeated delete is `NotFound`.
    pub async fn soft_delete(id: GoodId, project_id: ProjectId, pool: &PgPool) -> GoodsResult<Self> {
        sqlx::query_as::<_, Self>(&format!(
            r#"
            UPDATE goods
            SET removed = TRUE
            WHERE id = $1 AND project_id = $2 AND removed = FALSE
            RETURNING {}
            "#,
            GOOD_COLUMNS
        ))
        .bind(id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GoodsError::NotFound)
    }

    /// One page of active goods ordered by creation time, with project counters.
    ///
    /// Counters and page are read from the same snapshot.
    pub async fn list(query: &ListQuery, pool: &PgPool) -> GoodsResult<GoodsPage> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let (total, removed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE removed)
            FROM goods
            WHERE project_id = $1
            "#,
        )
        .bind(query.project_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = match query.sort {
            SortDirection::Asc => LIST_ASC,
            SortDirection::Desc => LIST_DESC,
        };
        let goods = sqlx::query_as::<_, Self>(sql)
            .bind(query.project_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(GoodsPage {
            goods,
            total,
            removed,
        })
    }

    /// Highest priority ever assigned in the project, 0 when it has no goods.
    pub async fn max_priority(project_id: ProjectId, pool: &PgPool) -> GoodsResult<i32> {
        Self::max_priority_with(project_id, pool).await
    }

    async fn max_priority_with<'e, E>(project_id: ProjectId, executor: E) -> GoodsResult<i32>
    where
        E: PgExecutor<'e>,
    {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(priority) FROM goods WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(executor)
                .await?;
        Ok(max.unwrap_or(0))
    }

    /// Move an active good to `new_priority` and return the affected suffix.
    ///
    /// Inside one transaction:
    /// 0. take the project's rank lock (shared with `create`)
    /// 1. lock the target row (scoped to project, active only)
    /// 2. shift every other active good at or above `new_priority` up by one
    /// 3. set the target to `new_priority`
    /// 4. read back active goods with `priority >= new_priority`, ascending
    ///
    /// Moving a good to the priority it already holds changes nothing.
    /// Any failure rolls the whole transaction back.
    pub async fn reprioritize(
        id: GoodId,
        project_id: ProjectId,
        new_priority: i32,
        pool: &PgPool,
    ) -> GoodsResult<Vec<Self>> {
        let mut tx = pool.begin().await?;

        lock_project_ranks(project_id, &mut *tx).await?;

        let current: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT priority
            FROM goods
            WHERE id = $1 AND project_id = $2 AND removed = FALSE
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Err(GoodsError::NotFound);
        };

        if current != new_priority {
            let shifted = sqlx::query(
                r#"
                UPDATE goods
                SET priority = priority + 1
                WHERE project_id = $1 AND removed = FALSE AND id <> $2 AND priority >= $3
                "#,
            )
            .bind(project_id)
            .bind(id)
            .bind(new_priority)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            sqlx::query("UPDATE goods SET priority = $1 WHERE id = $2")
                .bind(new_priority)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            debug!(
                good_id = %id,
                project_id = %project_id,
                from = current,
                to = new_priority,
                shifted,
                "reprioritized good"
            );
        }

        let affected = sqlx::query_as::<_, Self>(&format!(
            r#"
            SELECT {}
            FROM goods
            WHERE project_id = $1 AND removed = FALSE AND priority >= $2
            ORDER BY priority ASC, id ASC
            "#,
            GOOD_COLUMNS
        ))
        .bind(project_id)
        .bind(new_priority)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(affected)
    }
}

/// Serialize every rank change of one project until the transaction ends.
///
/// Row locks alone are not enough: a shift under READ COMMITTED misses rows
/// a concurrent create commits, and two shifts over each other's targets
/// deadlock.
async fn lock_project_ranks<'e, E>(project_id: ProjectId, executor: E) -> GoodsResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(project_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Rank after `max`, or a validation error once the project's ranks reach
/// `i32::MAX`.
pub(crate) fn next_priority(max: i32) -> GoodsResult<i32> {
    max.checked_add(1)
        .ok_or_else(|| GoodsError::validation("priority range exhausted for project"))
}
