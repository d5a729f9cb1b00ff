//! Row types mapped by sqlx
//!
//! Thin mirrors of the schema; conversion into the wire document happens in
//! `store::SyncStore::find_player_full`.

pub mod audit;
pub mod player;
pub mod server;
pub mod side;
pub mod stats;

pub use audit::AuditRow;
pub use player::PlayerRow;
pub use server::GameServerRow;
pub use side::{
    DiscordLinkRow, KillRow, LoadoutRow, PerkRow, PurchaseRow, RewardRow, SkinsRow, SupporterRow,
    UnlockRow, VehicleKillRow, WeaponXpRow,
};
pub use stats::StatsRow;
