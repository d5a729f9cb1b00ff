//! Typed storage primitives
//!
//! `SyncStore` decomposes the v2 document into the relational model and
//! recomposes it from one consistent snapshot. Every mutation primitive
//! joins a transaction handed in by the caller; the store never opens a
//! transaction on its own. Loadout and perks use replace semantics, every
//! other side table upserts.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use roster_core::{LoadoutEntry, PlayerDoc, SkinsDoc, StatsDoc, TrackingDoc};

use crate::entities::{
    KillRow, LoadoutRow, PerkRow, PlayerRow, PurchaseRow, RewardRow, SkinsRow, StatsRow,
    SupporterRow, UnlockRow, VehicleKillRow, WeaponXpRow,
};
use crate::error::StoreResult;
use crate::schema::ROSTER_SCHEMA;

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite connection URL (`sqlite://path` or `sqlite::memory:`)
    pub url: String,
    /// Pool upper bound
    pub max_connections: u32,
    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://roster.db".to_string(),
            max_connections: 8,
            acquire_timeout_secs: 30,
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables
    ///
    /// - DB_URL: connection URL
    /// - DB_MAX_CONNECTIONS: pool upper bound
    /// - DB_ACQUIRE_TIMEOUT: seconds to wait for a free connection
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("DB_URL").unwrap_or(defaults.url),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.acquire_timeout_secs),
        }
    }

    /// In-memory database for tests. A single connection keeps every
    /// statement on the same memory instance.
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        }
    }
}

/// Typed store over the relational model
#[derive(Clone)]
pub struct SyncStore {
    pool: SqlitePool,
}

impl SyncStore {
    /// Open a connection pool
    pub async fn connect(config: &DbConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// The underlying pool, shared with the registry and audit sink
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the schema (idempotent)
    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in ROSTER_SCHEMA.split(';') {
            let sql: String = statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n");
            if sql.trim().is_empty() {
                continue;
            }
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Begin the transaction an operation runs inside
    pub async fn begin(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // ======================================================================
    // Player aggregate
    // ======================================================================

    pub async fn find_player(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        steam_id: &str,
    ) -> StoreResult<Option<PlayerRow>> {
        let row = sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE steam_id = ?")
            .bind(steam_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    /// Find the player for `steam_id`, creating the row plus a default
    /// stats row on first sight. Side tables start empty.
    pub async fn find_or_create_player(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        steam_id: &str,
        eos_id: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<PlayerRow> {
        if let Some(existing) = self.find_player(tx, steam_id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO players (steam_id, eos_id, name, sync_seq, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(steam_id)
        .bind(eos_id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let player_id = result.last_insert_rowid();
        self.upsert_stats(tx, player_id, &StatsDoc::default()).await?;

        let row = sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE id = ?")
            .bind(player_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row)
    }

    /// Update external id and display name when the document carries them
    pub async fn update_identity(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        eos_id: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE players SET eos_id = COALESCE(?, eos_id), name = COALESCE(?, name), \
             updated_at = ? WHERE id = ?",
        )
        .bind(eos_id)
        .bind(name)
        .bind(Utc::now())
        .bind(player_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Advance the sequence number and last-sync stamp
    pub async fn bump_sync_seq(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        sync_seq: i64,
        last_sync: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE players SET sync_seq = ?, last_sync = ?, updated_at = ? WHERE id = ?")
            .bind(sync_seq)
            .bind(last_sync)
            .bind(Utc::now())
            .bind(player_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ======================================================================
    // Session lock
    // ======================================================================

    /// Optimistic check-and-set of the session lock. The update only lands
    /// when the player is unowned, already owned by `server_id`, or the
    /// previous session expired before `cutoff`. Returns rows affected: a
    /// zero means the caller lost the race and must re-read.
    pub async fn claim_session(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        server_id: &str,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE players SET active_server_id = ?, active_since = ?, updated_at = ? \
             WHERE id = ? AND (active_server_id IS NULL OR active_server_id = ? \
                               OR active_since IS NULL OR active_since < ?)",
        )
        .bind(server_id)
        .bind(now)
        .bind(now)
        .bind(player_id)
        .bind(server_id)
        .bind(cutoff)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_session(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE players SET active_server_id = NULL, active_since = NULL, updated_at = ? \
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(player_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Players currently pinned to a server (for `server:info`)
    pub async fn count_active_players(&self, server_id: &str) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM players WHERE active_server_id = ?")
                .bind(server_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ======================================================================
    // 1:1 upserts
    // ======================================================================

    pub async fn get_stats(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
    ) -> StoreResult<StatsDoc> {
        let row = sqlx::query_as::<_, StatsRow>("SELECT * FROM player_stats WHERE player_id = ?")
            .bind(player_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.map(|r| r.to_doc()).unwrap_or_default())
    }

    pub async fn upsert_stats(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        stats: &StatsDoc,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO player_stats (player_id, currency, currency_total, currency_spent, \
                 xp, xp_total, prestige, perma_tokens, daily_claims, games_played, time_played, \
                 join_time, daily_claim_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (player_id) DO UPDATE SET \
                 currency = excluded.currency, \
                 currency_total = excluded.currency_total, \
                 currency_spent = excluded.currency_spent, \
                 xp = excluded.xp, \
                 xp_total = excluded.xp_total, \
                 prestige = excluded.prestige, \
                 perma_tokens = excluded.perma_tokens, \
                 daily_claims = excluded.daily_claims, \
                 games_played = excluded.games_played, \
                 time_played = excluded.time_played, \
                 join_time = excluded.join_time, \
                 daily_claim_time = excluded.daily_claim_time",
        )
        .bind(player_id)
        .bind(stats.currency)
        .bind(stats.currency_total)
        .bind(stats.currency_spent)
        .bind(stats.xp)
        .bind(stats.xp_total)
        .bind(stats.prestige)
        .bind(stats.perma_tokens)
        .bind(stats.daily_claims)
        .bind(stats.games_played)
        .bind(stats.time_played)
        .bind(stats.join_time)
        .bind(stats.daily_claim_time)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_skins(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        skins: &SkinsDoc,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO player_skins (player_id, indfor, blufor, redfor) VALUES (?, ?, ?, ?) \
             ON CONFLICT (player_id) DO UPDATE SET \
                 indfor = excluded.indfor, blufor = excluded.blufor, redfor = excluded.redfor",
        )
        .bind(player_id)
        .bind(&skins.indfor)
        .bind(&skins.blufor)
        .bind(&skins.redfor)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// The document carries supporter tiers as a list; the model keeps at
    /// most one row per player. An empty list clears the row.
    pub async fn upsert_supporter(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        tiers: &[String],
    ) -> StoreResult<()> {
        match tiers.first() {
            Some(tier) => {
                sqlx::query(
                    "INSERT INTO supporter_status (player_id, tier) VALUES (?, ?) \
                     ON CONFLICT (player_id) DO UPDATE SET tier = excluded.tier",
                )
                .bind(player_id)
                .bind(tier)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM supporter_status WHERE player_id = ?")
                    .bind(player_id)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }

    // ======================================================================
    // Replace semantics (loadout, perks)
    // ======================================================================

    /// Delete-then-insert so stale slots never leak across syncs
    pub async fn replace_loadout(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        loadout: &[LoadoutEntry],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM loadout_slots WHERE player_id = ?")
            .bind(player_id)
            .execute(&mut **tx)
            .await?;
        for entry in loadout {
            sqlx::query(
                "INSERT INTO loadout_slots (player_id, slot, family, item, count) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(player_id)
            .bind(entry.slot)
            .bind(&entry.family)
            .bind(&entry.item)
            .bind(entry.count)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn replace_perks(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        perks: &[String],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM player_perks WHERE player_id = ?")
            .bind(player_id)
            .execute(&mut **tx)
            .await?;
        for perk in perks {
            sqlx::query(
                "INSERT INTO player_perks (player_id, perk_name) VALUES (?, ?) \
                 ON CONFLICT (player_id, perk_name) DO NOTHING",
            )
            .bind(player_id)
            .bind(perk)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    // ======================================================================
    // Additive upserts
    // ======================================================================

    /// Existing rows keep their original unlock timestamp
    pub async fn upsert_permanent_unlock(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        weapon_name: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO permanent_unlocks (player_id, weapon_name, unlocked_at) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, weapon_name) DO NOTHING",
        )
        .bind(player_id)
        .bind(weapon_name)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // Tracking values are absolute counters; the newest value wins.

    pub async fn upsert_kill(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        victim_steam_id: &str,
        kill_count: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO kills (player_id, victim_steam_id, kill_count) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, victim_steam_id) DO UPDATE SET kill_count = excluded.kill_count",
        )
        .bind(player_id)
        .bind(victim_steam_id)
        .bind(kill_count)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_vehicle_kill(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        vehicle_name: &str,
        kill_count: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO vehicle_kills (player_id, vehicle_name, kill_count) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, vehicle_name) DO UPDATE SET kill_count = excluded.kill_count",
        )
        .bind(player_id)
        .bind(vehicle_name)
        .bind(kill_count)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_purchase(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        item_name: &str,
        purchase_count: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO purchases (player_id, item_name, purchase_count) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, item_name) DO UPDATE SET purchase_count = excluded.purchase_count",
        )
        .bind(player_id)
        .bind(item_name)
        .bind(purchase_count)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_weapon_xp(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        weapon_name: &str,
        xp: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO weapon_xp (player_id, weapon_name, xp) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, weapon_name) DO UPDATE SET xp = excluded.xp",
        )
        .bind(player_id)
        .bind(weapon_name)
        .bind(xp)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_reward(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        reward_type: &str,
        count: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO rewards (player_id, reward_type, count) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, reward_type) DO UPDATE SET count = excluded.count",
        )
        .bind(player_id)
        .bind(reward_type)
        .bind(count)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ======================================================================
    // Discord links
    // ======================================================================

    pub async fn link_discord(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        player_id: i64,
        discord_id: &str,
        verified: bool,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO discord_links (player_id, discord_id, verified) VALUES (?, ?, ?) \
             ON CONFLICT (player_id, discord_id) DO UPDATE SET verified = excluded.verified",
        )
        .bind(player_id)
        .bind(discord_id)
        .bind(verified)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ======================================================================
    // Full document recomposition
    // ======================================================================

    /// Player plus all associations in one consistent snapshot, recomposed
    /// into the v2 wire shape (tracking included)
    pub async fn find_player_full(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        steam_id: &str,
    ) -> StoreResult<Option<PlayerDoc>> {
        let Some(player) = self.find_player(tx, steam_id).await? else {
            return Ok(None);
        };

        let stats = self.get_stats(tx, player.id).await?;

        let skins = sqlx::query_as::<_, SkinsRow>("SELECT * FROM player_skins WHERE player_id = ?")
            .bind(player.id)
            .fetch_optional(&mut **tx)
            .await?
            .map(|r| r.to_doc())
            .unwrap_or_default();

        let supporter =
            sqlx::query_as::<_, SupporterRow>("SELECT * FROM supporter_status WHERE player_id = ?")
                .bind(player.id)
                .fetch_optional(&mut **tx)
                .await?;

        let loadout = sqlx::query_as::<_, LoadoutRow>(
            "SELECT player_id, slot, family, item, count FROM loadout_slots \
             WHERE player_id = ? ORDER BY id",
        )
        .bind(player.id)
        .fetch_all(&mut **tx)
        .await?;

        let perks = sqlx::query_as::<_, PerkRow>(
            "SELECT player_id, perk_name FROM player_perks WHERE player_id = ? ORDER BY rowid",
        )
        .bind(player.id)
        .fetch_all(&mut **tx)
        .await?;

        let unlocks = sqlx::query_as::<_, UnlockRow>(
            "SELECT player_id, weapon_name, unlocked_at FROM permanent_unlocks \
             WHERE player_id = ? ORDER BY rowid",
        )
        .bind(player.id)
        .fetch_all(&mut **tx)
        .await?;

        let mut tracking = TrackingDoc::default();

        let kill_rows =
            sqlx::query_as::<_, KillRow>("SELECT * FROM kills WHERE player_id = ?")
                .bind(player.id)
                .fetch_all(&mut **tx)
                .await?;
        for row in kill_rows {
            tracking.kills.insert(row.victim_steam_id, row.kill_count);
        }

        let vehicle_rows =
            sqlx::query_as::<_, VehicleKillRow>("SELECT * FROM vehicle_kills WHERE player_id = ?")
                .bind(player.id)
                .fetch_all(&mut **tx)
                .await?;
        for row in vehicle_rows {
            tracking.vehicle_kills.insert(row.vehicle_name, row.kill_count);
        }

        let purchase_rows =
            sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE player_id = ?")
                .bind(player.id)
                .fetch_all(&mut **tx)
                .await?;
        for row in purchase_rows {
            tracking.purchases.insert(row.item_name, row.purchase_count);
        }

        let weapon_rows =
            sqlx::query_as::<_, WeaponXpRow>("SELECT * FROM weapon_xp WHERE player_id = ?")
                .bind(player.id)
                .fetch_all(&mut **tx)
                .await?;
        for row in weapon_rows {
            tracking.weapon_xp.insert(row.weapon_name, row.xp);
        }

        let reward_rows =
            sqlx::query_as::<_, RewardRow>("SELECT * FROM rewards WHERE player_id = ?")
                .bind(player.id)
                .fetch_all(&mut **tx)
                .await?;
        for row in reward_rows {
            tracking.rewards.insert(row.reward_type, row.count);
        }

        Ok(Some(PlayerDoc {
            v: roster_core::constants::DOC_VERSION,
            steam_id: player.steam_id,
            eos_id: player.eos_id,
            name: player.name,
            server_id: player.active_server_id,
            last_sync: player.last_sync.unwrap_or(player.updated_at),
            sync_seq: player.sync_seq,
            stats,
            skins,
            loadout: loadout.iter().map(|r| r.to_entry()).collect(),
            perks: perks.into_iter().map(|r| r.perk_name).collect(),
            perma_unlocks: unlocks.into_iter().map(|r| r.weapon_name).collect(),
            supporter_status: supporter.map(|r| vec![r.tier]).unwrap_or_default(),
            tracking: Some(tracking),
        }))
    }

    // ======================================================================
    // Audit retention
    // ======================================================================

    /// Operator-run retention: drop non-flagged entries older than the
    /// horizon. Flagged entries are exempt.
    pub async fn prune_audit_log(&self, older_than_days: i64) -> StoreResult<u64> {
        let horizon = Utc::now() - chrono::Duration::days(older_than_days);
        let result = sqlx::query("DELETE FROM audit_log WHERE flagged = 0 AND created_at < ?")
            .bind(horizon)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SyncStore {
        let store = SyncStore::connect(&DbConfig::memory()).await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();

        let first = store
            .find_or_create_player(&mut tx, "76561198000000001", None, Some("alice"))
            .await
            .unwrap();
        let second = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("alice"));
        assert_eq!(second.sync_seq, 0);

        let stats = store.get_stats(&mut tx, first.id).await.unwrap();
        assert_eq!(stats, StatsDoc::default());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_loadout_drops_stale_slots() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        let first = vec![
            LoadoutEntry { slot: 0, family: None, item: "weapons/ak".into(), count: 1 },
            LoadoutEntry { slot: 1, family: None, item: "gear/medkit".into(), count: 3 },
        ];
        store.replace_loadout(&mut tx, player.id, &first).await.unwrap();

        let second = vec![LoadoutEntry {
            slot: 0,
            family: Some("rifle".into()),
            item: "weapons/m4".into(),
            count: 1,
        }];
        store.replace_loadout(&mut tx, player.id, &second).await.unwrap();

        let doc = store
            .find_player_full(&mut tx, "76561198000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.loadout, second);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_tracking_upserts_keep_newest_value() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        store
            .upsert_kill(&mut tx, player.id, "76561198000000099", 2)
            .await
            .unwrap();
        store
            .upsert_kill(&mut tx, player.id, "76561198000000099", 5)
            .await
            .unwrap();
        store.upsert_weapon_xp(&mut tx, player.id, "m4", 100).await.unwrap();
        store.upsert_weapon_xp(&mut tx, player.id, "m4", 350).await.unwrap();

        let doc = store
            .find_player_full(&mut tx, "76561198000000001")
            .await
            .unwrap()
            .unwrap();
        let tracking = doc.tracking.unwrap();
        assert_eq!(tracking.kills["76561198000000099"], 5);
        assert_eq!(tracking.weapon_xp["m4"], 350);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_permanent_unlock_keeps_first_timestamp() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        store.upsert_permanent_unlock(&mut tx, player.id, "ak74").await.unwrap();
        let first: UnlockRow = sqlx::query_as(
            "SELECT player_id, weapon_name, unlocked_at FROM permanent_unlocks \
             WHERE player_id = ? AND weapon_name = ?",
        )
        .bind(player.id)
        .bind("ak74")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

        store.upsert_permanent_unlock(&mut tx, player.id, "ak74").await.unwrap();
        let second: UnlockRow = sqlx::query_as(
            "SELECT player_id, weapon_name, unlocked_at FROM permanent_unlocks \
             WHERE player_id = ? AND weapon_name = ?",
        )
        .bind(player.id)
        .bind("ak74")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

        assert_eq!(first.unlocked_at, second.unlocked_at);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_discord_link_upserts_verification() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        store.link_discord(&mut tx, player.id, "184000000000000001", false).await.unwrap();
        store.link_discord(&mut tx, player.id, "184000000000000001", true).await.unwrap();

        let row: crate::entities::DiscordLinkRow =
            sqlx::query_as("SELECT * FROM discord_links WHERE player_id = ?")
                .bind(player.id)
                .fetch_one(&mut *tx)
                .await
                .unwrap();
        assert!(row.verified);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_claim_session_cas() {
        let store = memory_store().await;
        let now = Utc::now();
        let cutoff = now - chrono::Duration::seconds(30);

        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        let claimed = store
            .claim_session(&mut tx, player.id, "serverA", now, cutoff)
            .await
            .unwrap();
        assert_eq!(claimed, 1);

        // A different server cannot steal a fresh session
        let stolen = store
            .claim_session(&mut tx, player.id, "serverB", now, cutoff)
            .await
            .unwrap();
        assert_eq!(stolen, 0);

        // Re-claim by the owner is fine
        let reclaimed = store
            .claim_session(&mut tx, player.id, "serverA", now, cutoff)
            .await
            .unwrap();
        assert_eq!(reclaimed, 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_supporter_first_tier_wins_and_clears() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        let player = store
            .find_or_create_player(&mut tx, "76561198000000001", None, None)
            .await
            .unwrap();

        store
            .upsert_supporter(&mut tx, player.id, &["gold".to_string(), "silver".to_string()])
            .await
            .unwrap();
        let doc = store
            .find_player_full(&mut tx, "76561198000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.supporter_status, vec!["gold".to_string()]);

        store.upsert_supporter(&mut tx, player.id, &[]).await.unwrap();
        let doc = store
            .find_player_full(&mut tx, "76561198000000001")
            .await
            .unwrap()
            .unwrap();
        assert!(doc.supporter_status.is_empty());
        tx.commit().await.unwrap();
    }
}
