//! Side-table rows

use chrono::{DateTime, Utc};
use roster_core::{LoadoutEntry, SkinsDoc};
use sqlx::FromRow;

/// One row of `player_skins`
#[derive(Debug, Clone, FromRow)]
pub struct SkinsRow {
    pub player_id: i64,
    pub indfor: Option<String>,
    pub blufor: Option<String>,
    pub redfor: Option<String>,
}

impl SkinsRow {
    pub fn to_doc(&self) -> SkinsDoc {
        SkinsDoc {
            indfor: self.indfor.clone(),
            blufor: self.blufor.clone(),
            redfor: self.redfor.clone(),
        }
    }
}

/// One row of `supporter_status` (at most one per player)
#[derive(Debug, Clone, FromRow)]
pub struct SupporterRow {
    pub player_id: i64,
    pub tier: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One row of `loadout_slots`; insertion order preserved via the rowid
#[derive(Debug, Clone, FromRow)]
pub struct LoadoutRow {
    pub player_id: i64,
    pub slot: i64,
    pub family: Option<String>,
    pub item: String,
    pub count: i64,
}

impl LoadoutRow {
    pub fn to_entry(&self) -> LoadoutEntry {
        LoadoutEntry {
            slot: self.slot,
            family: self.family.clone(),
            item: self.item.clone(),
            count: self.count,
        }
    }
}

/// One row of `player_perks`
#[derive(Debug, Clone, FromRow)]
pub struct PerkRow {
    pub player_id: i64,
    pub perk_name: String,
}

/// One row of `permanent_unlocks`; `unlocked_at` survives re-upserts
#[derive(Debug, Clone, FromRow)]
pub struct UnlockRow {
    pub player_id: i64,
    pub weapon_name: String,
    pub unlocked_at: DateTime<Utc>,
}

/// One row of `rewards`
#[derive(Debug, Clone, FromRow)]
pub struct RewardRow {
    pub player_id: i64,
    pub reward_type: String,
    pub count: i64,
}

/// One row of `kills`, keyed by victim steam id
#[derive(Debug, Clone, FromRow)]
pub struct KillRow {
    pub player_id: i64,
    pub victim_steam_id: String,
    pub kill_count: i64,
}

/// One row of `vehicle_kills`
#[derive(Debug, Clone, FromRow)]
pub struct VehicleKillRow {
    pub player_id: i64,
    pub vehicle_name: String,
    pub kill_count: i64,
}

/// One row of `purchases`
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRow {
    pub player_id: i64,
    pub item_name: String,
    pub purchase_count: i64,
}

/// One row of `weapon_xp`
#[derive(Debug, Clone, FromRow)]
pub struct WeaponXpRow {
    pub player_id: i64,
    pub weapon_name: String,
    pub xp: i64,
}

/// One row of `discord_links`
#[derive(Debug, Clone, FromRow)]
pub struct DiscordLinkRow {
    pub id: i64,
    pub player_id: i64,
    pub discord_id: String,
    pub verified: bool,
}
