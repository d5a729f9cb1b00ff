//! Audit log row

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One row of `audit_log`. Summaries are stored as JSON text.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: i64,
    pub server_id: String,
    pub player_steam_id: String,
    pub kind: String,
    pub seq_before: Option<i64>,
    pub seq_after: i64,
    pub before_summary: Option<String>,
    pub after_summary: Option<String>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}
