//! v2 document validation
//!
//! Boundary validation for incoming documents. Collects every violation
//! instead of failing fast so the caller can report the full list in a
//! single `ValidationFailed` response.

use crate::constants::{DOC_VERSION, STEAM_ID_DIGITS};
use crate::types::document::PlayerDoc;

/// True when `s` is exactly 17 decimal digits
pub fn validate_steam_id(s: &str) -> bool {
    s.len() == STEAM_ID_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}

/// Validate a document against the v2 shape. An empty vec means valid.
pub fn validate_document(doc: &PlayerDoc) -> Vec<String> {
    let mut errors = Vec::new();

    if doc.v != DOC_VERSION {
        errors.push(format!("unsupported document version {} (expected {})", doc.v, DOC_VERSION));
    }

    if !validate_steam_id(&doc.steam_id) {
        errors.push(format!(
            "steamId must be exactly {} decimal digits, got '{}'",
            STEAM_ID_DIGITS, doc.steam_id
        ));
    }

    if doc.sync_seq < 0 {
        errors.push(format!("syncSeq must be non-negative, got {}", doc.sync_seq));
    }

    let stats = &doc.stats;
    let non_negative: [(&str, i64); 10] = [
        ("currency", stats.currency),
        ("currencyTotal", stats.currency_total),
        ("currencySpent", stats.currency_spent),
        ("xp", stats.xp),
        ("xpTotal", stats.xp_total),
        ("prestige", stats.prestige),
        ("permaTokens", stats.perma_tokens),
        ("dailyClaims", stats.daily_claims),
        ("gamesPlayed", stats.games_played),
        ("timePlayed", stats.time_played),
    ];
    for (field, value) in non_negative {
        if value < 0 {
            errors.push(format!("stats.{} must be non-negative, got {}", field, value));
        }
    }

    if stats.prestige > 100 {
        errors.push(format!("stats.prestige must be at most 100, got {}", stats.prestige));
    }

    for (i, entry) in doc.loadout.iter().enumerate() {
        if entry.slot < 0 {
            errors.push(format!("loadout[{}].slot must be non-negative, got {}", i, entry.slot));
        }
        if entry.item.is_empty() {
            errors.push(format!("loadout[{}].item must be a non-empty string", i));
        }
        if entry.count < 0 {
            errors.push(format!("loadout[{}].count must be non-negative, got {}", i, entry.count));
        }
    }

    if let Some(tracking) = &doc.tracking {
        let maps: [(&str, &std::collections::HashMap<String, i64>); 5] = [
            ("kills", &tracking.kills),
            ("vehicleKills", &tracking.vehicle_kills),
            ("purchases", &tracking.purchases),
            ("weaponXp", &tracking.weapon_xp),
            ("rewards", &tracking.rewards),
        ];
        for (map_name, map) in maps {
            for (key, value) in map {
                if *value < 0 {
                    errors.push(format!(
                        "tracking.{}['{}'] must be a non-negative integer, got {}",
                        map_name, key, value
                    ));
                }
            }
        }
        for victim in tracking.kills.keys() {
            if !validate_steam_id(victim) {
                errors.push(format!("tracking.kills key '{}' is not a valid steamId", victim));
            }
        }
    }

    errors
}
