//! `GET /health`: Postgres decides the status code; cache and event bus
//! only downgrade the body to `degraded`.

use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

/// Per-dependency probe budget.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub postgres: PostgresStatus,
    pub cache: CacheStatus,
    pub events: EventsStatus,
}

#[derive(Debug, Serialize)]
pub struct PostgresStatus {
    pub reachable: bool,
    pub pool_size: u32,
    pub pool_idle: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    /// `redis`, or `none` when the server started without a cache
    pub backend: &'static str,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsStatus {
    pub connected: bool,
}

pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthReport>) {
    let postgres_error = probe(async {
        sqlx::query("SELECT 1").execute(&state.db_pool).await?;
        anyhow::Ok(())
    })
    .await;
    let cache_error = probe(state.cache.ping()).await;

    let postgres = PostgresStatus {
        reachable: postgres_error.is_none(),
        pool_size: state.db_pool.size(),
        pool_idle: state.db_pool.num_idle(),
        error: postgres_error,
    };
    let cache = CacheStatus {
        backend: state.cache.backend(),
        reachable: cache_error.is_none(),
        error: cache_error,
    };
    let events = EventsStatus {
        connected: state.nats.is_connected(),
    };

    let (code, status) = if !postgres.reachable {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else if !cache.reachable || !events.connected {
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthReport {
            status,
            postgres,
            cache,
            events,
        }),
    )
}

/// Run a dependency check under `PROBE_TIMEOUT`, returning the failure text.
async fn probe<F>(check: F) -> Option<String>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    match tokio::time::timeout(PROBE_TIMEOUT, check).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("no answer within {:?}", PROBE_TIMEOUT)),
    }
}
