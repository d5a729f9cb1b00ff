//! Canonical v2 player document
//!
//! The single in-memory shape every entry point parses into. Incoming JSON
//! is validated at the boundary (`crate::validation`); past that point no
//! untyped maps propagate inward except the five tracking dictionaries,
//! which are genuinely open-keyed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::DOC_VERSION;

/// Full player progression document, version 2.
///
/// `tracking` is optional on the wire: periodic syncs may omit it, and the
/// document returned on Connect never carries it (the game server rebuilds
/// tracking fresh each session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDoc {
    pub v: u32,
    pub steam_id: String,
    #[serde(default)]
    pub eos_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    pub last_sync: DateTime<Utc>,
    pub sync_seq: i64,
    pub stats: StatsDoc,
    #[serde(default)]
    pub skins: SkinsDoc,
    #[serde(default)]
    pub loadout: Vec<LoadoutEntry>,
    #[serde(default)]
    pub perks: Vec<String>,
    #[serde(default)]
    pub perma_unlocks: Vec<String>,
    #[serde(default)]
    pub supporter_status: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingDoc>,
}

impl PlayerDoc {
    /// All-defaults document for a player seen for the first time
    pub fn fresh(steam_id: impl Into<String>) -> Self {
        Self {
            v: DOC_VERSION,
            steam_id: steam_id.into(),
            eos_id: None,
            name: None,
            server_id: None,
            last_sync: Utc::now(),
            sync_seq: 0,
            stats: StatsDoc::default(),
            skins: SkinsDoc::default(),
            loadout: Vec::new(),
            perks: Vec::new(),
            perma_unlocks: Vec::new(),
            supporter_status: Vec::new(),
            tracking: None,
        }
    }

    /// Strip the tracking section (Connect responses never include it)
    pub fn without_tracking(mut self) -> Self {
        self.tracking = None;
        self
    }
}

/// Aggregate progression stats, one row per player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDoc {
    pub currency: i64,
    pub currency_total: i64,
    pub currency_spent: i64,
    pub xp: i64,
    pub xp_total: i64,
    pub prestige: i64,
    pub perma_tokens: i64,
    pub daily_claims: i64,
    pub games_played: i64,
    /// Seconds of play time
    pub time_played: i64,
    #[serde(default)]
    pub join_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub daily_claim_time: Option<DateTime<Utc>>,
}

impl Default for StatsDoc {
    fn default() -> Self {
        Self {
            currency: 0,
            currency_total: 0,
            currency_spent: 0,
            xp: 0,
            xp_total: 0,
            prestige: 0,
            perma_tokens: 0,
            daily_claims: 0,
            games_played: 0,
            time_played: 0,
            join_time: None,
            daily_claim_time: None,
        }
    }
}

/// Per-faction skin selection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinsDoc {
    #[serde(default)]
    pub indfor: Option<String>,
    #[serde(default)]
    pub blufor: Option<String>,
    #[serde(default)]
    pub redfor: Option<String>,
}

/// One loadout slot. Duplicates across slots are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadoutEntry {
    pub slot: i64,
    #[serde(default)]
    pub family: Option<String>,
    pub item: String,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    1
}

/// The five open-keyed counter maps maintained by the game server during a
/// session. Values are absolute counters, not deltas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingDoc {
    #[serde(default)]
    pub kills: HashMap<String, i64>,
    #[serde(default)]
    pub vehicle_kills: HashMap<String, i64>,
    #[serde(default)]
    pub purchases: HashMap<String, i64>,
    #[serde(default)]
    pub weapon_xp: HashMap<String, i64>,
    #[serde(default)]
    pub rewards: HashMap<String, i64>,
}

impl TrackingDoc {
    /// True when every map is empty
    pub fn is_empty(&self) -> bool {
        self.kills.is_empty()
            && self.vehicle_kills.is_empty()
            && self.purchases.is_empty()
            && self.weapon_xp.is_empty()
            && self.rewards.is_empty()
    }
}
