//! API route handlers

pub mod health;
pub mod sync;

use axum::middleware;
use axum::{routing::get, routing::post, Router};

use crate::auth::require_api_key;
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/sync/player", post(sync::upsert_player))
        .route("/api/sync/batch", post(sync::upsert_batch))
        .route("/api/sync/status/:steam_id", get(sync::sync_status))
        .route("/api/sync/player/:steam_id", get(sync::get_player))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/api/sync/health", get(health::health_check))
        .merge(protected)
        .with_state(state)
}
