//! Player stats row

use chrono::{DateTime, Utc};
use roster_core::StatsDoc;
use sqlx::FromRow;

/// One row of `player_stats`
#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub player_id: i64,
    pub currency: i64,
    pub currency_total: i64,
    pub currency_spent: i64,
    pub xp: i64,
    pub xp_total: i64,
    pub prestige: i64,
    pub perma_tokens: i64,
    pub daily_claims: i64,
    pub games_played: i64,
    pub time_played: i64,
    pub join_time: Option<DateTime<Utc>>,
    pub daily_claim_time: Option<DateTime<Utc>>,
}

impl StatsRow {
    pub fn to_doc(&self) -> StatsDoc {
        StatsDoc {
            currency: self.currency,
            currency_total: self.currency_total,
            currency_spent: self.currency_spent,
            xp: self.xp,
            xp_total: self.xp_total,
            prestige: self.prestige,
            perma_tokens: self.perma_tokens,
            daily_claims: self.daily_claims,
            games_played: self.games_played,
            time_played: self.time_played,
            join_time: self.join_time,
            daily_claim_time: self.daily_claim_time,
        }
    }
}
