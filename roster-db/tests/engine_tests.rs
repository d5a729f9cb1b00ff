//! Engine integration tests against an in-memory database
//!
//! Exercises the session/conflict protocol end to end: connect contention,
//! sequence validation, delta flagging, crash recovery, and the audit
//! trail.

use std::sync::Arc;

use chrono::Utc;
use roster_core::constants::{CONNECT_MAX_RETRIES, CONNECT_RETRY_AFTER_MS};
use roster_core::{
    ConnectOutcome, GameServerRecord, LoadoutEntry, PlayerDoc, SyncKind, SyncOutcome, TrackingDoc,
};
use roster_db::{DbConfig, MemoryAuditSink, SqlAuditSink, StoreError, SyncEngine, SyncStore};

const STEAM_ID: &str = "76561198000000001";
const VICTIM_ID: &str = "76561198000000099";

async fn setup() -> (Arc<SyncStore>, Arc<MemoryAuditSink>, SyncEngine) {
    let store = Arc::new(SyncStore::connect(&DbConfig::memory()).await.unwrap());
    store.init_schema().await.unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = SyncEngine::new(store.clone(), audit.clone());
    (store, audit, engine)
}

fn server(id: &str) -> GameServerRecord {
    GameServerRecord {
        server_id: id.to_string(),
        active: true,
        flagged: false,
        flag_reason: None,
        last_seen: None,
        created_at: Utc::now(),
    }
}

fn doc_with_seq(sync_seq: i64) -> PlayerDoc {
    let mut doc = PlayerDoc::fresh(STEAM_ID);
    doc.sync_seq = sync_seq;
    doc
}

async fn granted_doc(engine: &SyncEngine, server: &GameServerRecord) -> PlayerDoc {
    match engine.connect(STEAM_ID, None, None, server).await.unwrap() {
        ConnectOutcome::Granted { doc } => doc,
        other => panic!("expected granted connect, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fresh_player_connect() {
    let (store, audit, engine) = setup().await;
    let server_a = server("serverA");

    let doc = granted_doc(&engine, &server_a).await;
    assert_eq!(doc.steam_id, STEAM_ID);
    assert_eq!(doc.sync_seq, 0);
    assert!(doc.tracking.is_none());
    assert_eq!(doc.stats, Default::default());

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.active_server_id.as_deref(), Some("serverA"));
    assert!(player.active_since.is_some());
    tx.commit().await.unwrap();

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, SyncKind::Connect);
    assert_eq!(entries[0].seq_before, None);
    assert_eq!(entries[0].seq_after, 0);
}

#[tokio::test]
async fn test_connect_rejects_malformed_steam_id() {
    let (_store, _audit, engine) = setup().await;
    match engine
        .connect("7656119800000000", None, None, &server("serverA"))
        .await
        .unwrap()
    {
        ConnectOutcome::Rejected { reason } => assert!(reason.contains("17")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_hop_contention() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    let server_b = server("serverB");

    granted_doc(&engine, &server_a).await;

    match engine.connect(STEAM_ID, None, None, &server_b).await.unwrap() {
        ConnectOutcome::Wait {
            active_server,
            retry_after_ms,
            max_retries,
            ..
        } => {
            assert_eq!(active_server, "serverA");
            assert_eq!(retry_after_ms, CONNECT_RETRY_AFTER_MS);
            assert_eq!(max_retries, CONNECT_MAX_RETRIES);
        }
        other => panic!("expected wait, got {:?}", other),
    }

    // No transition: serverA still owns the player and the seq is untouched
    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.active_server_id.as_deref(), Some("serverA"));
    assert_eq!(player.sync_seq, 0);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_on_same_server_is_granted() {
    let (_store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;
    granted_doc(&engine, &server_a).await;
}

#[tokio::test]
async fn test_expired_session_can_be_claimed() {
    let (store, _audit, engine) = setup().await;
    granted_doc(&engine, &server("serverA")).await;

    // Age the session past the ownership window
    let stale = Utc::now() - chrono::Duration::seconds(31);
    sqlx::query("UPDATE players SET active_since = ? WHERE steam_id = ?")
        .bind(stale)
        .bind(STEAM_ID)
        .execute(store.pool())
        .await
        .unwrap();

    let doc = granted_doc(&engine, &server("serverB")).await;
    assert_eq!(doc.sync_seq, 0);

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.active_server_id.as_deref(), Some("serverB"));
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_periodic_then_disconnect_flow() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut sync1 = doc_with_seq(1);
    sync1.stats.currency = 100;
    match engine.periodic_sync(&sync1, &server_a).await.unwrap() {
        SyncOutcome::Applied { sync_seq, flagged, .. } => {
            assert_eq!(sync_seq, 1);
            assert!(!flagged);
        }
        other => panic!("expected applied, got {:?}", other),
    }

    let mut bye = doc_with_seq(2);
    bye.stats.currency = 200;
    let mut tracking = TrackingDoc::default();
    tracking.kills.insert(VICTIM_ID.to_string(), 5);
    bye.tracking = Some(tracking);
    match engine.disconnect(&bye, &server_a).await.unwrap() {
        SyncOutcome::Applied { sync_seq, .. } => assert_eq!(sync_seq, 2),
        other => panic!("expected applied, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.active_server_id, None);
    assert_eq!(player.active_since, None);
    assert_eq!(player.sync_seq, 2);

    let full = store.find_player_full(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(full.stats.currency, 200);
    assert_eq!(full.tracking.unwrap().kills[VICTIM_ID], 5);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_round_trip_export_matches_disconnect_doc() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut sent = doc_with_seq(1);
    sent.stats.currency = 500;
    sent.stats.currency_total = 500;
    sent.stats.xp_total = 1_000;
    sent.stats.games_played = 1;
    sent.skins.blufor = Some("skins/forest".to_string());
    sent.loadout = vec![
        LoadoutEntry { slot: 0, family: Some("rifle".into()), item: "weapons/m4".into(), count: 1 },
        LoadoutEntry { slot: 1, family: None, item: "gear/medkit".into(), count: 2 },
    ];
    sent.perks = vec!["sprint".to_string(), "medic".to_string()];
    sent.perma_unlocks = vec!["m4".to_string()];
    sent.supporter_status = vec!["gold".to_string()];
    let mut tracking = TrackingDoc::default();
    tracking.kills.insert(VICTIM_ID.to_string(), 3);
    tracking.purchases.insert("ammo".to_string(), 7);
    sent.tracking = Some(tracking);

    match engine.disconnect(&sent, &server_a).await.unwrap() {
        SyncOutcome::Applied { .. } => {}
        other => panic!("expected applied, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let mut exported = store.find_player_full(&mut tx, STEAM_ID).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    exported.last_sync = sent.last_sync;
    assert_eq!(exported, sent);
}

#[tokio::test]
async fn test_replayed_document_is_refused() {
    let (_store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let sync1 = doc_with_seq(1);
    assert!(engine.periodic_sync(&sync1, &server_a).await.unwrap().is_applied());

    match engine.periodic_sync(&sync1, &server_a).await.unwrap() {
        SyncOutcome::InvalidSyncSeq { expected_seq } => assert_eq!(expected_seq, 1),
        other => panic!("expected invalid seq, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sequence_jump_tolerance_boundary() {
    let (_store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    // Jump of exactly SEQ_TOLERANCE is allowed
    assert!(engine
        .periodic_sync(&doc_with_seq(10), &server_a)
        .await
        .unwrap()
        .is_applied());

    // Jump of SEQ_TOLERANCE + 1 is refused
    match engine.periodic_sync(&doc_with_seq(21), &server_a).await.unwrap() {
        SyncOutcome::InvalidSyncSeq { expected_seq } => assert_eq!(expected_seq, 10),
        other => panic!("expected invalid seq, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_owner_sync_is_refused() {
    let (_store, _audit, engine) = setup().await;
    granted_doc(&engine, &server("serverA")).await;

    match engine
        .periodic_sync(&doc_with_seq(1), &server("serverB"))
        .await
        .unwrap()
    {
        SyncOutcome::NotSessionOwner { active_server } => {
            assert_eq!(active_server.as_deref(), Some("serverA"));
        }
        other => panic!("expected ownership refusal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_for_unknown_player() {
    let (_store, _audit, engine) = setup().await;
    match engine
        .periodic_sync(&doc_with_seq(1), &server("serverA"))
        .await
        .unwrap()
    {
        SyncOutcome::PlayerNotFound => {}
        other => panic!("expected player not found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_failure_leaves_state_untouched() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut bad = doc_with_seq(1);
    bad.stats.prestige = 101;
    bad.stats.currency = 9_999;
    match engine.periodic_sync(&bad, &server_a).await.unwrap() {
        SyncOutcome::ValidationFailed { errors } => {
            assert!(errors.iter().any(|e| e.contains("prestige")));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.sync_seq, 0);
    let stats = store.get_stats(&mut tx, player.id).await.unwrap();
    assert_eq!(stats.currency, 0);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_delta_flag_commits_with_reason() {
    let (store, audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut rich = doc_with_seq(1);
    rich.stats.currency_total = 60_000;
    match engine.periodic_sync(&rich, &server_a).await.unwrap() {
        SyncOutcome::Applied { flagged, flag_reason, .. } => {
            assert!(flagged);
            assert!(flag_reason.unwrap().contains("Currency gain"));
        }
        other => panic!("expected flagged apply, got {:?}", other),
    }

    // The update still landed
    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    let stats = store.get_stats(&mut tx, player.id).await.unwrap();
    assert_eq!(stats.currency_total, 60_000);
    tx.commit().await.unwrap();

    let entry = audit.entries().into_iter().last().unwrap();
    assert!(entry.flagged);
    assert!(entry.flag_reason.unwrap().contains("Currency gain"));
}

#[tokio::test]
async fn test_delta_boundary_exact_limit_is_clean() {
    let (_store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut at_limit = doc_with_seq(1);
    at_limit.stats.currency_total = 50_000;
    match engine.periodic_sync(&at_limit, &server_a).await.unwrap() {
        SyncOutcome::Applied { flagged, .. } => assert!(!flagged),
        other => panic!("expected apply, got {:?}", other),
    }

    let mut over = doc_with_seq(2);
    over.stats.currency_total = 100_001;
    match engine.periodic_sync(&over, &server_a).await.unwrap() {
        SyncOutcome::Applied { flagged, .. } => assert!(flagged),
        other => panic!("expected apply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stale_recovery_is_skipped() {
    let (store, audit, engine) = setup().await;
    let server_a = server("serverA");

    let mut tx = store.begin().await.unwrap();
    let player = store
        .find_or_create_player(&mut tx, STEAM_ID, None, None)
        .await
        .unwrap();
    store.bump_sync_seq(&mut tx, player.id, 10, Utc::now()).await.unwrap();
    tx.commit().await.unwrap();

    let mut stale = doc_with_seq(7);
    stale.stats.currency = 123;
    match engine.crash_recovery(&stale, &server_a).await.unwrap() {
        SyncOutcome::Skipped { reason } => assert_eq!(reason, "stale_data"),
        other => panic!("expected skip, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.sync_seq, 10);
    let stats = store.get_stats(&mut tx, player.id).await.unwrap();
    assert_eq!(stats.currency, 0);
    tx.commit().await.unwrap();

    // The decision itself is audited
    let entry = audit.entries().into_iter().last().unwrap();
    assert_eq!(entry.kind, SyncKind::CrashRecovery);
    assert_eq!(entry.flag_reason.as_deref(), Some("stale_data"));
}

#[tokio::test]
async fn test_recovery_clears_lock_and_matches_seq() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let mut recovered = doc_with_seq(4);
    recovered.stats.xp_total = 900;
    match engine.crash_recovery(&recovered, &server_a).await.unwrap() {
        SyncOutcome::Applied { sync_seq, flagged, .. } => {
            assert_eq!(sync_seq, 4);
            assert!(!flagged);
        }
        other => panic!("expected apply, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.sync_seq, 4);
    assert_eq!(player.active_server_id, None);
    assert_eq!(player.active_since, None);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_recovery_equal_seq_is_not_stale() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");

    let mut tx = store.begin().await.unwrap();
    let player = store
        .find_or_create_player(&mut tx, STEAM_ID, None, None)
        .await
        .unwrap();
    store.bump_sync_seq(&mut tx, player.id, 5, Utc::now()).await.unwrap();
    tx.commit().await.unwrap();

    assert!(engine
        .crash_recovery(&doc_with_seq(5), &server_a)
        .await
        .unwrap()
        .is_applied());
}

#[tokio::test]
async fn test_recovery_wide_jump_flags_instead_of_rejecting() {
    let (store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let recovered = doc_with_seq(101);
    match engine.crash_recovery(&recovered, &server_a).await.unwrap() {
        SyncOutcome::Applied { sync_seq, flagged, flag_reason } => {
            assert_eq!(sync_seq, 101);
            assert!(flagged);
            assert!(flag_reason.unwrap().contains("recovery tolerance"));
        }
        other => panic!("expected flagged apply, got {:?}", other),
    }

    let mut tx = store.begin().await.unwrap();
    let player = store.find_player(&mut tx, STEAM_ID).await.unwrap().unwrap();
    assert_eq!(player.sync_seq, 101);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_batch_recovery_isolates_failures() {
    let (_store, _audit, engine) = setup().await;
    let server_a = server("serverA");
    granted_doc(&engine, &server_a).await;

    let known = doc_with_seq(1);
    let mut unknown = PlayerDoc::fresh("76561198000000042");
    unknown.sync_seq = 1;
    let mut invalid = PlayerDoc::fresh(STEAM_ID);
    invalid.stats.prestige = 200;

    let summary = engine
        .batch_crash_recovery(&[known, unknown, invalid], &server_a)
        .await
        .unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 2);
    assert!(summary.results[0].outcome.is_applied());
    assert_eq!(summary.results[1].outcome, SyncOutcome::PlayerNotFound);
}

#[tokio::test]
async fn test_batch_recovery_cap() {
    let (_store, _audit, engine) = setup().await;
    let docs: Vec<PlayerDoc> = (0..101)
        .map(|i| PlayerDoc::fresh(format!("765611980{:08}", i)))
        .collect();
    match engine.batch_crash_recovery(&docs, &server("serverA")).await {
        Err(StoreError::BatchLimitExceeded { got, max }) => {
            assert_eq!(got, 101);
            assert_eq!(max, 100);
        }
        other => panic!("expected batch limit error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_sql_audit_sink_and_retention() {
    let store = Arc::new(SyncStore::connect(&DbConfig::memory()).await.unwrap());
    store.init_schema().await.unwrap();
    let engine = SyncEngine::new(store.clone(), Arc::new(SqlAuditSink));
    let server_a = server("serverA");

    match engine.connect(STEAM_ID, None, None, &server_a).await.unwrap() {
        ConnectOutcome::Granted { .. } => {}
        other => panic!("expected granted, got {:?}", other),
    }

    let mut flagged = doc_with_seq(1);
    flagged.stats.currency_total = 60_000;
    assert!(engine.periodic_sync(&flagged, &server_a).await.unwrap().is_applied());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);

    // Retention drops the clean connect entry but keeps the flagged sync
    let pruned = store.prune_audit_log(0).await.unwrap();
    assert_eq!(pruned, 1);
    let (kept,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log WHERE flagged = 1")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(kept, 1);
}
