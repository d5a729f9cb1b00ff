//! Per-sync delta limits
//!
//! Large single-sync gains are flagged for operator review without blocking
//! play. The service never interprets the stats semantically; it only
//! compares the incoming counters against the previously stored row.

use crate::constants::{
    MAX_CURRENCY_GAIN, MAX_CURRENCY_SPENT, MAX_PERMA_TOKEN_GAIN, MAX_PRESTIGE_GAIN,
    MAX_TIME_PLAYED_GAIN, MAX_XP_GAIN,
};
use crate::types::document::StatsDoc;

/// Compare incoming stats against the stored row. Returns one
/// human-readable reason per exceeded limit; empty means clean.
///
/// Exactly-at-limit is clean. Regressions (negative deltas) are not the
/// delta check's concern.
pub fn check_deltas(prev: &StatsDoc, next: &StatsDoc) -> Vec<String> {
    let mut reasons = Vec::new();

    let checks: [(&str, i64, i64); 6] = [
        ("Currency gain", next.currency_total - prev.currency_total, MAX_CURRENCY_GAIN),
        ("Currency spent", next.currency_spent - prev.currency_spent, MAX_CURRENCY_SPENT),
        ("XP gain", next.xp_total - prev.xp_total, MAX_XP_GAIN),
        ("Prestige gain", next.prestige - prev.prestige, MAX_PRESTIGE_GAIN),
        ("Perma token gain", next.perma_tokens - prev.perma_tokens, MAX_PERMA_TOKEN_GAIN),
        ("Time played gain", next.time_played - prev.time_played, MAX_TIME_PLAYED_GAIN),
    ];

    for (label, delta, limit) in checks {
        if delta > limit {
            reasons.push(format!("{} {} exceeds limit {}", label, delta, limit));
        }
    }

    reasons
}
