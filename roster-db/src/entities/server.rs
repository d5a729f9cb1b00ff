//! Game-server registry row

use chrono::{DateTime, Utc};
use roster_core::GameServerRecord;
use sqlx::FromRow;

/// One row of `game_servers`. The API token never leaves the registry
/// except at registration time.
#[derive(Debug, Clone, FromRow)]
pub struct GameServerRow {
    pub id: i64,
    pub server_id: String,
    pub api_token: String,
    pub active: bool,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GameServerRow {
    pub fn to_record(&self) -> GameServerRecord {
        GameServerRecord {
            server_id: self.server_id.clone(),
            active: self.active,
            flagged: self.flagged,
            flag_reason: self.flag_reason.clone(),
            last_seen: self.last_seen,
            created_at: self.created_at,
        }
    }
}
