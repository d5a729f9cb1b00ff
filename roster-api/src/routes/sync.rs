//! Sync endpoints for offline tooling

use axum::{
    extract::{Path, State},
    Json,
};

use roster_core::constants::MAX_BATCH_RECOVERY;
use roster_core::{PlayerDoc, SyncOutcome};
use roster_db::StoreError;

use crate::dto::{BatchRequest, BatchResponse, StatusResponse, UpsertResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Idempotent upsert of a single player document
pub async fn upsert_player(
    State(state): State<AppState>,
    Json(doc): Json<PlayerDoc>,
) -> ApiResult<Json<UpsertResponse>> {
    let outcome = state.engine.import_document(&doc, &state.api_origin).await?;
    outcome_to_response(doc.steam_id, outcome).map(Json)
}

/// Upsert up to 100 player documents; entries succeed or fail independently
pub async fn upsert_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    if request.players.len() > MAX_BATCH_RECOVERY {
        return Err(ApiError::BadRequest(format!(
            "batch of {} exceeds the {} entry limit",
            request.players.len(),
            MAX_BATCH_RECOVERY
        )));
    }

    let summary = state
        .engine
        .import_batch(&request.players, &state.api_origin)
        .await
        .map_err(|e| match e {
            StoreError::BatchLimitExceeded { got, max } => {
                ApiError::BadRequest(format!("batch of {} exceeds the {} entry limit", got, max))
            }
            other => ApiError::Store(other),
        })?;

    Ok(Json(BatchResponse::from_summary(summary)))
}

/// Last-sync timestamp and sequence for one player
pub async fn sync_status(
    State(state): State<AppState>,
    Path(steam_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let mut tx = state.store.begin().await?;
    let player = state.store.find_player(&mut tx, &steam_id).await?;
    tx.commit().await.map_err(StoreError::from)?;

    let player = player
        .ok_or_else(|| ApiError::NotFound(format!("player {} not found", steam_id)))?;

    Ok(Json(StatusResponse {
        steam_id: player.steam_id,
        last_sync: player.last_sync,
        sync_seq: player.sync_seq,
    }))
}

/// Full player document, tracking included
pub async fn get_player(
    State(state): State<AppState>,
    Path(steam_id): Path<String>,
) -> ApiResult<Json<PlayerDoc>> {
    let mut tx = state.store.begin().await?;
    let doc = state.store.find_player_full(&mut tx, &steam_id).await?;
    tx.commit().await.map_err(StoreError::from)?;

    doc.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player {} not found", steam_id)))
}

fn outcome_to_response(steam_id: String, outcome: SyncOutcome) -> ApiResult<UpsertResponse> {
    match outcome {
        SyncOutcome::Applied { sync_seq, flagged, flag_reason } => Ok(UpsertResponse {
            steam_id,
            sync_seq,
            flagged,
            skipped: None,
            reason: flag_reason,
        }),
        SyncOutcome::Skipped { reason } => Ok(UpsertResponse {
            steam_id,
            sync_seq: 0,
            flagged: false,
            skipped: Some(true),
            reason: Some(reason),
        }),
        SyncOutcome::ValidationFailed { errors } => Err(ApiError::Validation(errors)),
        SyncOutcome::PlayerNotFound => {
            Err(ApiError::NotFound(format!("player {} not found", steam_id)))
        }
        SyncOutcome::NotSessionOwner { active_server } => Err(ApiError::Conflict(format!(
            "player {} is active on {}",
            steam_id,
            active_server.as_deref().unwrap_or("another server")
        ))),
        SyncOutcome::InvalidSyncSeq { expected_seq } => Err(ApiError::Conflict(format!(
            "invalid sync sequence, expected {}",
            expected_seq
        ))),
        SyncOutcome::Transient { error } => Err(ApiError::InternalError(error)),
    }
}
