//! Relational schema (SQLite dialect)
//!
//! One aggregate (`players`) with its side tables, the game-server
//! registry, and the append-only audit log. All side tables are keyed by
//! the surrogate player id and cascade on delete.

/// Complete schema, applied by `SyncStore::init_schema`
pub const ROSTER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    steam_id          TEXT NOT NULL UNIQUE,
    eos_id            TEXT,
    name              TEXT,
    sync_seq          INTEGER NOT NULL DEFAULT 0,
    active_server_id  TEXT,
    active_since      TEXT,
    last_sync         TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_players_active_server ON players (active_server_id);

CREATE TABLE IF NOT EXISTS player_stats (
    player_id         INTEGER PRIMARY KEY REFERENCES players (id) ON DELETE CASCADE,
    currency          INTEGER NOT NULL DEFAULT 0,
    currency_total    INTEGER NOT NULL DEFAULT 0,
    currency_spent    INTEGER NOT NULL DEFAULT 0,
    xp                INTEGER NOT NULL DEFAULT 0,
    xp_total          INTEGER NOT NULL DEFAULT 0,
    prestige          INTEGER NOT NULL DEFAULT 0,
    perma_tokens      INTEGER NOT NULL DEFAULT 0,
    daily_claims      INTEGER NOT NULL DEFAULT 0,
    games_played      INTEGER NOT NULL DEFAULT 0,
    time_played       INTEGER NOT NULL DEFAULT 0,
    join_time         TEXT,
    daily_claim_time  TEXT
);

CREATE TABLE IF NOT EXISTS player_skins (
    player_id  INTEGER PRIMARY KEY REFERENCES players (id) ON DELETE CASCADE,
    indfor     TEXT,
    blufor     TEXT,
    redfor     TEXT
);

CREATE TABLE IF NOT EXISTS supporter_status (
    player_id   INTEGER PRIMARY KEY REFERENCES players (id) ON DELETE CASCADE,
    tier        TEXT NOT NULL,
    expires_at  TEXT
);

CREATE TABLE IF NOT EXISTS loadout_slots (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id  INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    slot       INTEGER NOT NULL,
    family     TEXT,
    item       TEXT NOT NULL,
    count      INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_loadout_player ON loadout_slots (player_id);

CREATE TABLE IF NOT EXISTS player_perks (
    player_id  INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    perk_name  TEXT NOT NULL,
    PRIMARY KEY (player_id, perk_name)
);

CREATE TABLE IF NOT EXISTS permanent_unlocks (
    player_id    INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    weapon_name  TEXT NOT NULL,
    unlocked_at  TEXT NOT NULL,
    PRIMARY KEY (player_id, weapon_name)
);

CREATE TABLE IF NOT EXISTS rewards (
    player_id    INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    reward_type  TEXT NOT NULL,
    count        INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, reward_type)
);

CREATE TABLE IF NOT EXISTS kills (
    player_id        INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    victim_steam_id  TEXT NOT NULL,
    kill_count       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, victim_steam_id)
);

CREATE TABLE IF NOT EXISTS vehicle_kills (
    player_id     INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    vehicle_name  TEXT NOT NULL,
    kill_count    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, vehicle_name)
);

CREATE TABLE IF NOT EXISTS purchases (
    player_id       INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    item_name       TEXT NOT NULL,
    purchase_count  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, item_name)
);

CREATE TABLE IF NOT EXISTS weapon_xp (
    player_id    INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    weapon_name  TEXT NOT NULL,
    xp           INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, weapon_name)
);

CREATE TABLE IF NOT EXISTS discord_links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id   INTEGER NOT NULL REFERENCES players (id) ON DELETE CASCADE,
    discord_id  TEXT NOT NULL,
    verified    INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, discord_id)
);

CREATE TABLE IF NOT EXISTS game_servers (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    server_id    TEXT NOT NULL UNIQUE,
    api_token    TEXT NOT NULL UNIQUE,
    active       INTEGER NOT NULL DEFAULT 1,
    flagged      INTEGER NOT NULL DEFAULT 0,
    flag_reason  TEXT,
    last_seen    TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    server_id        TEXT NOT NULL,
    player_steam_id  TEXT NOT NULL,
    kind             TEXT NOT NULL,
    seq_before       INTEGER,
    seq_after        INTEGER NOT NULL,
    before_summary   TEXT,
    after_summary    TEXT,
    flagged          INTEGER NOT NULL DEFAULT 0,
    flag_reason      TEXT,
    duration_ms      INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_player ON audit_log (player_steam_id, created_at);

CREATE INDEX IF NOT EXISTS idx_audit_flagged ON audit_log (flagged);
"#;
