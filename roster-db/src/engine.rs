//! Sync engine
//!
//! Enforces the session/conflict protocol over the store: the
//! active-server lock, sequence monotonicity, and per-sync delta limits.
//! Each operation runs inside one transaction and appends its audit entry
//! before commit. Domain refusals come back as `SyncOutcome` variants;
//! `Err` is reserved for storage faults.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use roster_core::constants::{
    ACTIVE_SERVER_TIMEOUT_SECS, CONNECT_MAX_RETRIES, CONNECT_RETRY_AFTER_MS, MAX_BATCH_RECOVERY,
    SEQ_TOLERANCE, SEQ_TOLERANCE_RECOVERY,
};
use roster_core::delta::check_deltas;
use roster_core::types::audit::stats_summary;
use roster_core::validation::{validate_document, validate_steam_id};
use roster_core::{
    AuditEntry, BatchEntryResult, BatchSummary, ConnectOutcome, GameServerRecord, PlayerDoc,
    SyncKind, SyncOutcome,
};

use crate::audit::AuditSink;
use crate::error::{StoreError, StoreResult};
use crate::store::SyncStore;

/// Which write path a sync-shaped document takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncMode {
    Periodic,
    Disconnect,
}

/// Orchestrates the four operation kinds over the store
pub struct SyncEngine {
    store: Arc<SyncStore>,
    audit: Arc<dyn AuditSink>,
}

impl SyncEngine {
    pub fn new(store: Arc<SyncStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<SyncStore> {
        &self.store
    }

    // ======================================================================
    // Connect
    // ======================================================================

    /// Claim the session lock and hand back the current document without
    /// tracking. A live session on another server yields `Wait` and no
    /// state change.
    pub async fn connect(
        &self,
        steam_id: &str,
        eos_id: Option<&str>,
        name: Option<&str>,
        server: &GameServerRecord,
    ) -> StoreResult<ConnectOutcome> {
        let started = Instant::now();

        if !validate_steam_id(steam_id) {
            return Ok(ConnectOutcome::Rejected {
                reason: format!("steamId must be exactly 17 decimal digits, got '{}'", steam_id),
            });
        }

        let now = Utc::now();
        let cutoff = now - Duration::seconds(ACTIVE_SERVER_TIMEOUT_SECS);

        let mut tx = self.store.begin().await?;
        let player = self
            .store
            .find_or_create_player(&mut tx, steam_id, eos_id, name)
            .await?;

        if player.owned_elsewhere(&server.server_id, cutoff) {
            let active_server = player.active_server_id.clone().unwrap_or_default();
            let active_since = player.active_since.unwrap_or(now);
            info!(
                steam_id = %steam_id,
                server_id = %server.server_id,
                active_server = %active_server,
                "connect contended, session owned elsewhere"
            );
            return Ok(ConnectOutcome::Wait {
                active_server,
                active_since,
                retry_after_ms: CONNECT_RETRY_AFTER_MS,
                max_retries: CONNECT_MAX_RETRIES,
            });
        }

        let claimed = self
            .store
            .claim_session(&mut tx, player.id, &server.server_id, now, cutoff)
            .await?;
        if claimed == 0 {
            // Lost the check-and-set race; the re-read decides deterministically
            let fresh = self
                .store
                .find_player(&mut tx, steam_id)
                .await?
                .ok_or_else(|| StoreError::PlayerNotFound(steam_id.to_string()))?;
            return Ok(ConnectOutcome::Wait {
                active_server: fresh.active_server_id.unwrap_or_default(),
                active_since: fresh.active_since.unwrap_or(now),
                retry_after_ms: CONNECT_RETRY_AFTER_MS,
                max_retries: CONNECT_MAX_RETRIES,
            });
        }

        let doc = self
            .store
            .find_player_full(&mut tx, steam_id)
            .await?
            .ok_or_else(|| StoreError::PlayerNotFound(steam_id.to_string()))?
            .without_tracking();

        self.audit
            .record(
                &mut tx,
                &AuditEntry {
                    server_id: server.server_id.clone(),
                    steam_id: steam_id.to_string(),
                    kind: SyncKind::Connect,
                    seq_before: None,
                    seq_after: doc.sync_seq,
                    before_summary: None,
                    after_summary: Some(stats_summary(&doc.stats)),
                    flagged: false,
                    flag_reason: None,
                    duration_ms: started.elapsed().as_millis() as i64,
                },
            )
            .await?;
        tx.commit().await?;

        info!(
            steam_id = %steam_id,
            server_id = %server.server_id,
            sync_seq = doc.sync_seq,
            duration_ms = started.elapsed().as_millis() as u64,
            "session claimed"
        );
        Ok(ConnectOutcome::Granted { doc })
    }

    // ======================================================================
    // Periodic sync / disconnect
    // ======================================================================

    pub async fn periodic_sync(
        &self,
        doc: &PlayerDoc,
        server: &GameServerRecord,
    ) -> StoreResult<SyncOutcome> {
        self.apply_sync(doc, server, SyncMode::Periodic).await
    }

    /// Periodic-sync semantics plus the session-lock release, in one
    /// transaction so there is no partial-commit window
    pub async fn disconnect(
        &self,
        doc: &PlayerDoc,
        server: &GameServerRecord,
    ) -> StoreResult<SyncOutcome> {
        self.apply_sync(doc, server, SyncMode::Disconnect).await
    }

    async fn apply_sync(
        &self,
        doc: &PlayerDoc,
        server: &GameServerRecord,
        mode: SyncMode,
    ) -> StoreResult<SyncOutcome> {
        let started = Instant::now();

        let errors = validate_document(doc);
        if !errors.is_empty() {
            return Ok(SyncOutcome::ValidationFailed { errors });
        }

        let mut tx = self.store.begin().await?;
        let Some(player) = self.store.find_player(&mut tx, &doc.steam_id).await? else {
            return Ok(SyncOutcome::PlayerNotFound);
        };

        match player.active_server_id.as_deref() {
            Some(owner) if owner == server.server_id => {}
            other => {
                return Ok(SyncOutcome::NotSessionOwner {
                    active_server: other.map(str::to_string),
                });
            }
        }

        // The document must be strictly ahead of the stored sequence and
        // within tolerance; a replayed or regressed document is refused.
        let stored_seq = player.sync_seq;
        if doc.sync_seq <= stored_seq || doc.sync_seq - stored_seq > SEQ_TOLERANCE {
            return Ok(SyncOutcome::InvalidSyncSeq { expected_seq: stored_seq });
        }

        let prev_stats = self.store.get_stats(&mut tx, player.id).await?;
        let reasons = check_deltas(&prev_stats, &doc.stats);
        let flagged = !reasons.is_empty();
        let flag_reason = flagged.then(|| reasons.join("; "));

        self.write_document(&mut tx, player.id, doc).await?;
        if mode == SyncMode::Disconnect {
            self.store.clear_session(&mut tx, player.id).await?;
        }

        let kind = match mode {
            SyncMode::Periodic => SyncKind::Periodic,
            SyncMode::Disconnect => SyncKind::Disconnect,
        };
        self.audit
            .record(
                &mut tx,
                &AuditEntry {
                    server_id: server.server_id.clone(),
                    steam_id: doc.steam_id.clone(),
                    kind,
                    seq_before: Some(stored_seq),
                    seq_after: doc.sync_seq,
                    before_summary: Some(stats_summary(&prev_stats)),
                    after_summary: Some(stats_summary(&doc.stats)),
                    flagged,
                    flag_reason: flag_reason.clone(),
                    duration_ms: started.elapsed().as_millis() as i64,
                },
            )
            .await?;
        tx.commit().await?;

        if flagged {
            warn!(
                steam_id = %doc.steam_id,
                server_id = %server.server_id,
                sync_seq = doc.sync_seq,
                reason = flag_reason.as_deref().unwrap_or_default(),
                "sync committed with review flag"
            );
        } else {
            info!(
                steam_id = %doc.steam_id,
                server_id = %server.server_id,
                sync_seq = doc.sync_seq,
                operation = kind.as_str(),
                duration_ms = started.elapsed().as_millis() as u64,
                "sync committed"
            );
        }

        Ok(SyncOutcome::Applied {
            sync_seq: doc.sync_seq,
            flagged,
            flag_reason,
        })
    }

    // ======================================================================
    // Crash recovery
    // ======================================================================

    /// Ingest a document left behind by a dead session. Stale documents are
    /// skipped (and audited); tolerance and delta violations flag instead
    /// of rejecting. The session lock is always cleared before writes.
    pub async fn crash_recovery(
        &self,
        doc: &PlayerDoc,
        server: &GameServerRecord,
    ) -> StoreResult<SyncOutcome> {
        let started = Instant::now();

        let errors = validate_document(doc);
        if !errors.is_empty() {
            return Ok(SyncOutcome::ValidationFailed { errors });
        }

        let mut tx = self.store.begin().await?;
        let Some(player) = self.store.find_player(&mut tx, &doc.steam_id).await? else {
            return Ok(SyncOutcome::PlayerNotFound);
        };

        let stored_seq = player.sync_seq;
        if doc.sync_seq < stored_seq {
            self.audit
                .record(
                    &mut tx,
                    &AuditEntry {
                        server_id: server.server_id.clone(),
                        steam_id: doc.steam_id.clone(),
                        kind: SyncKind::CrashRecovery,
                        seq_before: Some(stored_seq),
                        seq_after: stored_seq,
                        before_summary: None,
                        after_summary: None,
                        flagged: false,
                        flag_reason: Some("stale_data".to_string()),
                        duration_ms: started.elapsed().as_millis() as i64,
                    },
                )
                .await?;
            tx.commit().await?;

            info!(
                steam_id = %doc.steam_id,
                server_id = %server.server_id,
                recovered_seq = doc.sync_seq,
                stored_seq,
                "crash recovery skipped stale document"
            );
            return Ok(SyncOutcome::Skipped {
                reason: "stale_data".to_string(),
            });
        }

        let mut reasons = Vec::new();
        if doc.sync_seq - stored_seq > SEQ_TOLERANCE_RECOVERY {
            reasons.push(format!(
                "Sync sequence jump {} exceeds recovery tolerance {}",
                doc.sync_seq - stored_seq,
                SEQ_TOLERANCE_RECOVERY
            ));
        }

        let prev_stats = self.store.get_stats(&mut tx, player.id).await?;
        reasons.extend(check_deltas(&prev_stats, &doc.stats));
        let flagged = !reasons.is_empty();
        let flag_reason = flagged.then(|| reasons.join("; "));

        self.store.clear_session(&mut tx, player.id).await?;
        self.write_document(&mut tx, player.id, doc).await?;

        self.audit
            .record(
                &mut tx,
                &AuditEntry {
                    server_id: server.server_id.clone(),
                    steam_id: doc.steam_id.clone(),
                    kind: SyncKind::CrashRecovery,
                    seq_before: Some(stored_seq),
                    seq_after: doc.sync_seq,
                    before_summary: Some(stats_summary(&prev_stats)),
                    after_summary: Some(stats_summary(&doc.stats)),
                    flagged,
                    flag_reason: flag_reason.clone(),
                    duration_ms: started.elapsed().as_millis() as i64,
                },
            )
            .await?;
        tx.commit().await?;

        info!(
            steam_id = %doc.steam_id,
            server_id = %server.server_id,
            sync_seq = doc.sync_seq,
            flagged,
            "crash recovery committed"
        );
        Ok(SyncOutcome::Applied {
            sync_seq: doc.sync_seq,
            flagged,
            flag_reason,
        })
    }

    /// Recover a batch of orphaned documents independently; one bad entry
    /// never aborts the rest
    pub async fn batch_crash_recovery(
        &self,
        docs: &[PlayerDoc],
        server: &GameServerRecord,
    ) -> StoreResult<BatchSummary> {
        if docs.len() > MAX_BATCH_RECOVERY {
            return Err(StoreError::BatchLimitExceeded {
                got: docs.len(),
                max: MAX_BATCH_RECOVERY,
            });
        }

        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            let outcome = match self.crash_recovery(doc, server).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        steam_id = %doc.steam_id,
                        error = %e,
                        "batch recovery entry failed"
                    );
                    SyncOutcome::Transient { error: e.to_string() }
                }
            };
            results.push(BatchEntryResult {
                steam_id: doc.steam_id.clone(),
                outcome,
            });
        }

        let summary = BatchSummary::from_results(results);
        info!(
            server_id = %server.server_id,
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "batch crash recovery complete"
        );
        Ok(summary)
    }

    // ======================================================================
    // Offline import (HTTP surface)
    // ======================================================================

    /// Idempotent document upsert for offline tooling. Unknown players are
    /// created first, then the document takes the crash-recovery path, so
    /// stale uploads are skipped and suspicious ones flag instead of
    /// rejecting.
    pub async fn import_document(
        &self,
        doc: &PlayerDoc,
        server: &GameServerRecord,
    ) -> StoreResult<SyncOutcome> {
        let errors = validate_document(doc);
        if !errors.is_empty() {
            return Ok(SyncOutcome::ValidationFailed { errors });
        }

        let mut tx = self.store.begin().await?;
        self.store
            .find_or_create_player(&mut tx, &doc.steam_id, doc.eos_id.as_deref(), doc.name.as_deref())
            .await?;
        tx.commit().await?;

        self.crash_recovery(doc, server).await
    }

    /// Batch variant of [`SyncEngine::import_document`], bounded like batch
    /// crash recovery
    pub async fn import_batch(
        &self,
        docs: &[PlayerDoc],
        server: &GameServerRecord,
    ) -> StoreResult<BatchSummary> {
        if docs.len() > MAX_BATCH_RECOVERY {
            return Err(StoreError::BatchLimitExceeded {
                got: docs.len(),
                max: MAX_BATCH_RECOVERY,
            });
        }

        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            let outcome = match self.import_document(doc, server).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(steam_id = %doc.steam_id, error = %e, "batch import entry failed");
                    SyncOutcome::Transient { error: e.to_string() }
                }
            };
            results.push(BatchEntryResult {
                steam_id: doc.steam_id.clone(),
                outcome,
            });
        }
        Ok(BatchSummary::from_results(results))
    }

    // ======================================================================
    // Shared write path
    // ======================================================================

    /// Decompose one validated document into the relational model. Loadout
    /// and perks are replaced wholesale; everything else upserts.
    async fn write_document(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        player_id: i64,
        doc: &PlayerDoc,
    ) -> StoreResult<()> {
        self.store
            .update_identity(tx, player_id, doc.eos_id.as_deref(), doc.name.as_deref())
            .await?;
        self.store
            .bump_sync_seq(tx, player_id, doc.sync_seq, doc.last_sync)
            .await?;

        self.store.upsert_stats(tx, player_id, &doc.stats).await?;
        self.store.upsert_skins(tx, player_id, &doc.skins).await?;
        self.store
            .upsert_supporter(tx, player_id, &doc.supporter_status)
            .await?;

        self.store.replace_loadout(tx, player_id, &doc.loadout).await?;
        self.store.replace_perks(tx, player_id, &doc.perks).await?;

        for weapon in &doc.perma_unlocks {
            self.store.upsert_permanent_unlock(tx, player_id, weapon).await?;
        }

        if let Some(tracking) = &doc.tracking {
            for (victim, count) in &tracking.kills {
                self.store.upsert_kill(tx, player_id, victim, *count).await?;
            }
            for (vehicle, count) in &tracking.vehicle_kills {
                self.store.upsert_vehicle_kill(tx, player_id, vehicle, *count).await?;
            }
            for (item, count) in &tracking.purchases {
                self.store.upsert_purchase(tx, player_id, item, *count).await?;
            }
            for (weapon, xp) in &tracking.weapon_xp {
                self.store.upsert_weapon_xp(tx, player_id, weapon, *xp).await?;
            }
            for (reward, count) in &tracking.rewards {
                self.store.upsert_reward(tx, player_id, reward, *count).await?;
            }
        }

        Ok(())
    }
}
