//! Registered game-server record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game server known to the registry.
///
/// `flagged` is advisory (logged, never blocking); `active` gates
/// authentication outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameServerRecord {
    pub server_id: String,
    pub active: bool,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GameServerRecord {
    /// Synthetic origin record for operations arriving over the HTTP
    /// surface rather than a game-server session
    pub fn api_origin() -> Self {
        Self {
            server_id: "api".to_string(),
            active: true,
            flagged: false,
            flag_reason: None,
            last_seen: None,
            created_at: Utc::now(),
        }
    }
}
