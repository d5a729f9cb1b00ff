//! Health check endpoint

use axum::{extract::State, Json};
use chrono::Utc;

use crate::dto::HealthResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Health check endpoint (no auth)
pub async fn health_check(State(_state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: "rostersync".to_string(),
        timestamp: Utc::now(),
    }))
}
