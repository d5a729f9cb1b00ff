//! Tagged operation outcomes
//!
//! The engine never returns `Err` for a domain-level refusal; every refusal
//! is a variant here so callers can translate it into the matching wire
//! frame or HTTP status. `Err` is reserved for storage and transport faults.

use chrono::{DateTime, Utc};

use crate::types::document::PlayerDoc;

/// Outcome of a sync-shaped operation (periodic, disconnect, recovery)
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Writes committed. `flagged` is set when a delta or recovery-tolerance
    /// limit was exceeded; the sync still succeeds.
    Applied {
        sync_seq: i64,
        flagged: bool,
        flag_reason: Option<String>,
    },
    /// Document violates the v2 shape. No state change.
    ValidationFailed { errors: Vec<String> },
    /// Sequence or ownership check hit an unknown player
    PlayerNotFound,
    /// Another server owns the session; caller may re-Connect
    NotSessionOwner { active_server: Option<String> },
    /// Sequence regressed, replayed, or jumped past tolerance; caller must
    /// re-read before retrying
    InvalidSyncSeq { expected_seq: i64 },
    /// Crash recovery declined stale data. No writes.
    Skipped { reason: String },
    /// Storage or transport fault; the operation is idempotent and the
    /// caller is free to retry
    Transient { error: String },
}

impl SyncOutcome {
    /// True when the operation committed writes
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// True when the caller got an acknowledgment (committed or an
    /// explicitly-audited skip)
    pub fn is_acked(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Skipped { .. })
    }
}

/// Outcome of a Connect
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// Session claimed. The document never includes tracking.
    Granted { doc: PlayerDoc },
    /// Another server holds a live session; retry after the advertised delay
    Wait {
        active_server: String,
        active_since: DateTime<Utc>,
        retry_after_ms: u64,
        max_retries: u32,
    },
    /// Connect refused outright (malformed steam id)
    Rejected { reason: String },
}

/// Per-entry result inside a batch crash recovery
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntryResult {
    pub steam_id: String,
    pub outcome: SyncOutcome,
}

/// Summary of a batch crash recovery run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntryResult>,
}

impl BatchSummary {
    /// Build a summary from per-entry results; acked entries count as
    /// successful, everything else as failed
    pub fn from_results(results: Vec<BatchEntryResult>) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.outcome.is_acked()).count();
        Self {
            total,
            successful,
            failed: total - successful,
            results,
        }
    }
}
