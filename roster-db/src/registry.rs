//! Game-server registry
//!
//! Authoritative token → server lookup and the server-wide session sweep.
//! Tokens are generated from a cryptographically strong source (256 bits,
//! URL-safe base64) and never logged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::{info, warn};

use roster_core::GameServerRecord;

use crate::entities::GameServerRow;
use crate::error::{StoreError, StoreResult};

/// Result of a token lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedServer {
    /// Token matches an active server. A flagged server still resolves;
    /// the flag is advisory and logged by the caller.
    Active(GameServerRecord),
    /// Token matches a deactivated server; authentication is refused
    Inactive(GameServerRecord),
    /// No server carries this token
    NotFound,
}

/// Registry over the shared pool
#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate an opaque API token: 32 random bytes, URL-safe base64
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Register a new game server and return its record plus the freshly
    /// issued token (the only time the token is handed out)
    pub async fn register_server(&self, server_id: &str) -> StoreResult<(GameServerRecord, String)> {
        let token = Self::generate_token();
        sqlx::query(
            "INSERT INTO game_servers (server_id, api_token, active, flagged, created_at) \
             VALUES (?, ?, 1, 0, ?)",
        )
        .bind(server_id)
        .bind(&token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = self.fetch_server(server_id).await?;
        info!(server_id = %server_id, "registered game server");
        Ok((row.to_record(), token))
    }

    /// Token → server record. Inactive servers resolve but are refused;
    /// flagged servers resolve with the flag carried through.
    pub async fn resolve_token(&self, token: &str) -> StoreResult<ResolvedServer> {
        let row = sqlx::query_as::<_, GameServerRow>("SELECT * FROM game_servers WHERE api_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            None => ResolvedServer::NotFound,
            Some(row) if !row.active => ResolvedServer::Inactive(row.to_record()),
            Some(row) => {
                if row.flagged {
                    warn!(
                        server_id = %row.server_id,
                        reason = row.flag_reason.as_deref().unwrap_or("unspecified"),
                        "flagged game server authenticated"
                    );
                }
                ResolvedServer::Active(row.to_record())
            }
        })
    }

    pub async fn get_server(&self, server_id: &str) -> StoreResult<Option<GameServerRecord>> {
        let row = sqlx::query_as::<_, GameServerRow>("SELECT * FROM game_servers WHERE server_id = ?")
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.to_record()))
    }

    pub async fn list_servers(&self) -> StoreResult<Vec<GameServerRecord>> {
        let rows =
            sqlx::query_as::<_, GameServerRow>("SELECT * FROM game_servers ORDER BY server_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|r| r.to_record()).collect())
    }

    pub async fn set_active(&self, server_id: &str, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE game_servers SET active = ? WHERE server_id = ?")
            .bind(active)
            .bind(server_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ServerNotFound(server_id.to_string()));
        }
        Ok(())
    }

    pub async fn flag_server(&self, server_id: &str, reason: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE game_servers SET flagged = 1, flag_reason = ? WHERE server_id = ?")
            .bind(reason)
            .bind(server_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ServerNotFound(server_id.to_string()));
        }
        Ok(())
    }

    /// Stamp server liveness; called on authenticated traffic
    pub async fn touch_last_seen(&self, server_id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE game_servers SET last_seen = ? WHERE server_id = ?")
            .bind(Utc::now())
            .bind(server_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Atomically release every player pinned to a server. Called when the
    /// server's transport drops. Returns how many sessions were cleared.
    pub async fn sweep_server(&self, server_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE players SET active_server_id = NULL, active_since = NULL, updated_at = ? \
             WHERE active_server_id = ?",
        )
        .bind(Utc::now())
        .bind(server_id)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            info!(server_id = %server_id, count = swept, "swept active sessions");
        }
        Ok(swept)
    }

    async fn fetch_server(&self, server_id: &str) -> StoreResult<GameServerRow> {
        let row = sqlx::query_as::<_, GameServerRow>("SELECT * FROM game_servers WHERE server_id = ?")
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ServerNotFound(server_id.to_string()))?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DbConfig, SyncStore};

    async fn setup() -> (SyncStore, Registry) {
        let store = SyncStore::connect(&DbConfig::memory()).await.unwrap();
        store.init_schema().await.unwrap();
        let registry = Registry::new(store.pool().clone());
        (store, registry)
    }

    #[test]
    fn test_token_entropy_and_shape() {
        let a = Registry::generate_token();
        let b = Registry::generate_token();
        assert_ne!(a, b);
        // 32 bytes -> 43 unpadded base64 chars
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_resolve_token_states() {
        let (_store, registry) = setup().await;
        let (record, token) = registry.register_server("serverA").await.unwrap();
        assert_eq!(record.server_id, "serverA");

        match registry.resolve_token(&token).await.unwrap() {
            ResolvedServer::Active(server) => assert_eq!(server.server_id, "serverA"),
            other => panic!("expected active, got {:?}", other),
        }

        registry.set_active("serverA", false).await.unwrap();
        match registry.resolve_token(&token).await.unwrap() {
            ResolvedServer::Inactive(server) => assert_eq!(server.server_id, "serverA"),
            other => panic!("expected inactive, got {:?}", other),
        }

        assert_eq!(
            registry.resolve_token("no-such-token").await.unwrap(),
            ResolvedServer::NotFound
        );
    }

    #[tokio::test]
    async fn test_flagged_server_still_resolves() {
        let (_store, registry) = setup().await;
        let (_, token) = registry.register_server("serverA").await.unwrap();
        registry.flag_server("serverA", "suspicious payouts").await.unwrap();

        match registry.resolve_token(&token).await.unwrap() {
            ResolvedServer::Active(server) => {
                assert!(server.flagged);
                assert_eq!(server.flag_reason.as_deref(), Some("suspicious payouts"));
            }
            other => panic!("expected active, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_clears_all_pinned_players() {
        let (store, registry) = setup().await;
        let now = Utc::now();
        let cutoff = now - chrono::Duration::seconds(30);

        let mut tx = store.begin().await.unwrap();
        for i in 1..=5 {
            let steam_id = format!("7656119800000000{}", i);
            let player = store
                .find_or_create_player(&mut tx, &steam_id, None, None)
                .await
                .unwrap();
            store
                .claim_session(&mut tx, player.id, "serverA", now, cutoff)
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let swept = registry.sweep_server("serverA").await.unwrap();
        assert_eq!(swept, 5);
        assert_eq!(store.count_active_players("serverA").await.unwrap(), 0);
    }
}
