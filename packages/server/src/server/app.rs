//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::domains::goods::GoodsService;
use crate::kernel::{BaseCache, NatsPublisher, ServerDeps};
use crate::server::routes::{
    create_good, get_good, health_handler, list_goods, remove_good, reprioritize_good, update_good,
};

/// Upper bound for a single request, including store and cache round trips.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub goods: Arc<GoodsService>,
    /// Probed by `/health` only; goods traffic goes through `goods`
    pub cache: Arc<dyn BaseCache>,
    pub nats: Arc<dyn NatsPublisher>,
}

impl AppState {
    pub fn from_deps(deps: &ServerDeps) -> Self {
        Self {
            db_pool: deps.db_pool.clone(),
            goods: Arc::new(deps.goods_service()),
            cache: deps.cache.clone(),
            nats: deps.nats.clone(),
        }
    }
}

/// Build the Axum application router
pub fn build_app(deps: &ServerDeps) -> Router {
    router(AppState::from_deps(deps))
}

/// Router over an already assembled state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/good/create", post(create_good))
        .route("/good/:id", get(get_good))
        .route("/good/update/:id", patch(update_good))
        .route("/good/remove/:id", delete(remove_good))
        .route("/goods/list", get(list_goods))
        .route("/goods/:id/reprioritize", patch(reprioritize_good))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}
