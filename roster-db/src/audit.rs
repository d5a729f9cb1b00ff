//! Audit sink
//!
//! One-method observer interface. Production writes into `audit_log`
//! inside the operation's transaction so an entry can never outlive a
//! rolled-back sync; tests capture entries in memory.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use std::sync::Mutex;

use roster_core::AuditEntry;

use crate::error::StoreResult;

/// Append-only event log of every sync attempt
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one entry within the supplied transaction
    async fn record(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        entry: &AuditEntry,
    ) -> StoreResult<()>;
}

/// Production sink writing to the `audit_log` table
pub struct SqlAuditSink;

#[async_trait]
impl AuditSink for SqlAuditSink {
    async fn record(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        entry: &AuditEntry,
    ) -> StoreResult<()> {
        let before = entry
            .before_summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let after = entry
            .after_summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO audit_log (server_id, player_steam_id, kind, seq_before, seq_after, \
                 before_summary, after_summary, flagged, flag_reason, duration_ms, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.server_id)
        .bind(&entry.steam_id)
        .bind(entry.kind.as_str())
        .bind(entry.seq_before)
        .bind(entry.seq_after)
        .bind(before)
        .bind(after)
        .bind(entry.flagged)
        .bind(&entry.flag_reason)
        .bind(entry.duration_ms)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(
        &self,
        _tx: &mut Transaction<'_, Sqlite>,
        entry: &AuditEntry,
    ) -> StoreResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
