//! Data Transfer Objects for API requests and responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::{BatchSummary, PlayerDoc, SyncOutcome};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Single-document upsert response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    pub steam_id: String,
    pub sync_seq: i64,
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Batch upsert request
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub players: Vec<PlayerDoc>,
}

/// Per-entry batch result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntryResponse {
    pub steam_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch upsert response
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntryResponse>,
}

impl BatchResponse {
    pub fn from_summary(summary: BatchSummary) -> Self {
        let results = summary
            .results
            .into_iter()
            .map(|entry| {
                let (status, error) = match &entry.outcome {
                    SyncOutcome::Applied { .. } => ("applied".to_string(), None),
                    SyncOutcome::Skipped { reason } => {
                        ("skipped".to_string(), Some(reason.clone()))
                    }
                    SyncOutcome::ValidationFailed { errors } => {
                        ("failed".to_string(), Some(errors.join("; ")))
                    }
                    SyncOutcome::PlayerNotFound => {
                        ("failed".to_string(), Some("player not found".to_string()))
                    }
                    SyncOutcome::NotSessionOwner { active_server } => (
                        "failed".to_string(),
                        Some(format!(
                            "player active on {}",
                            active_server.as_deref().unwrap_or("another server")
                        )),
                    ),
                    SyncOutcome::InvalidSyncSeq { expected_seq } => (
                        "failed".to_string(),
                        Some(format!("invalid sync seq, expected {}", expected_seq)),
                    ),
                    SyncOutcome::Transient { error } => {
                        ("failed".to_string(), Some(error.clone()))
                    }
                };
                BatchEntryResponse {
                    steam_id: entry.steam_id,
                    status,
                    error,
                }
            })
            .collect();

        Self {
            total: summary.total,
            successful: summary.successful,
            failed: summary.failed,
            results,
        }
    }
}

/// Last-sync status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub steam_id: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_seq: i64,
}
