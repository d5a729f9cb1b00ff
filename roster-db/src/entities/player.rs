//! Player aggregate row

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One row of `players`. The surrogate `id` keys every side table; the
/// steam id is the external identity.
#[derive(Debug, Clone, FromRow)]
pub struct PlayerRow {
    pub id: i64,
    pub steam_id: String,
    pub eos_id: Option<String>,
    pub name: Option<String>,
    pub sync_seq: i64,
    pub active_server_id: Option<String>,
    pub active_since: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerRow {
    /// True when a live session on a server other than `server_id` holds
    /// this player, judged against the given expiry cutoff.
    pub fn owned_elsewhere(&self, server_id: &str, cutoff: DateTime<Utc>) -> bool {
        match (&self.active_server_id, self.active_since) {
            (Some(owner), Some(since)) => owner != server_id && since >= cutoff,
            _ => false,
        }
    }
}
