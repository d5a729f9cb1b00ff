//! Shared-secret authentication
//!
//! Every route except health requires the `X-API-Key` header to match the
//! configured secret. An unset secret refuses everything rather than
//! falling open.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware guarding the authenticated routes
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.api_key.is_empty() {
        return Err(ApiError::Unauthorized(
            "sync API key is not configured".to_string(),
        ));
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.api_key.as_str()) {
        return Err(ApiError::Unauthorized("invalid API key".to_string()));
    }

    Ok(next.run(request).await)
}
