//! Audit trail records
//!
//! Every sync attempt that commits produces one entry, written in the same
//! transaction as the data it describes. The audit log is append-only and
//! never read back on the hot path.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::document::StatsDoc;

/// Which operation produced an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Connect,
    Periodic,
    Disconnect,
    CrashRecovery,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Periodic => "periodic",
            Self::Disconnect => "disconnect",
            Self::CrashRecovery => "crash_recovery",
        }
    }
}

impl std::fmt::Display for SyncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit record, ready for the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub server_id: String,
    pub steam_id: String,
    pub kind: SyncKind,
    pub seq_before: Option<i64>,
    pub seq_after: i64,
    pub before_summary: Option<serde_json::Value>,
    pub after_summary: Option<serde_json::Value>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub duration_ms: i64,
}

/// Compact stats summary stored in the before/after columns
pub fn stats_summary(stats: &StatsDoc) -> serde_json::Value {
    json!({
        "currencyTotal": stats.currency_total,
        "currencySpent": stats.currency_spent,
        "xpTotal": stats.xp_total,
        "prestige": stats.prestige,
        "permaTokens": stats.perma_tokens,
        "timePlayed": stats.time_played,
        "gamesPlayed": stats.games_played,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(SyncKind::Connect.as_str(), "connect");
        assert_eq!(SyncKind::CrashRecovery.as_str(), "crash_recovery");
    }

    #[test]
    fn test_stats_summary_fields() {
        let mut stats = StatsDoc::default();
        stats.currency_total = 1200;
        stats.prestige = 3;
        let summary = stats_summary(&stats);
        assert_eq!(summary["currencyTotal"], 1200);
        assert_eq!(summary["prestige"], 3);
        assert_eq!(summary["timePlayed"], 0);
    }
}
