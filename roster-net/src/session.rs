//! Per-connection session
//!
//! One session per authenticated game-server connection, regardless of
//! which side dialed. The session owns the per-steamId wait bookkeeping
//! and maps each inbound frame to exactly one engine call; frames from
//! one server are handled in arrival order, which serializes operations
//! per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use roster_core::constants::MAX_BATCH_RECOVERY;
use roster_core::{ConnectOutcome, GameServerRecord, SyncOutcome};
use roster_db::{Registry, SyncEngine};

use crate::error::{NetError, NetResult};
use crate::message::{send_frame, ClientFrame, ServerFrame};
use crate::registry::ConnectionRegistry;

/// Frame-to-engine dispatcher for one authenticated connection
pub struct Session {
    engine: Arc<SyncEngine>,
    registry: Registry,
    server: GameServerRecord,
    /// Server-hop retry bookkeeping, keyed by steamId
    wait_attempts: HashMap<String, u32>,
}

impl Session {
    pub fn new(engine: Arc<SyncEngine>, registry: Registry, server: GameServerRecord) -> Self {
        Self {
            engine,
            registry,
            server,
            wait_attempts: HashMap::new(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server.server_id
    }

    /// Handle one inbound frame; returns the frames to send back in order
    pub async fn handle_frame(&mut self, frame: ClientFrame) -> Vec<ServerFrame> {
        if let Err(e) = self.registry.touch_last_seen(&self.server.server_id).await {
            debug!(error = %e, "failed to stamp server liveness");
        }

        match frame {
            // Authentication already happened at the transport boundary
            ClientFrame::Auth { .. } => Vec::new(),

            ClientFrame::PlayerConnect { steam_id, eos_id, name } => {
                self.handle_connect(steam_id, eos_id, name).await
            }

            ClientFrame::PlayerSync(doc) => {
                let steam_id = doc.steam_id.clone();
                match self.engine.periodic_sync(&doc, &self.server).await {
                    Ok(SyncOutcome::Applied { sync_seq, flagged, .. }) => {
                        vec![ServerFrame::SyncAck { steam_id, sync_seq, flagged }]
                    }
                    Ok(outcome) => {
                        let (error, errors) = sync_error_text(&outcome);
                        vec![ServerFrame::SyncError { steam_id, error, errors }]
                    }
                    Err(e) => {
                        error!(steam_id = %steam_id, error = %e, "periodic sync failed");
                        vec![ServerFrame::SyncError {
                            steam_id,
                            error: "transient".to_string(),
                            errors: None,
                        }]
                    }
                }
            }

            ClientFrame::PlayerDisconnect(doc) => {
                let steam_id = doc.steam_id.clone();
                match self.engine.disconnect(&doc, &self.server).await {
                    Ok(SyncOutcome::Applied { sync_seq, .. }) => {
                        vec![ServerFrame::DisconnectAck { steam_id, sync_seq }]
                    }
                    Ok(outcome) => {
                        let (error, _) = sync_error_text(&outcome);
                        vec![ServerFrame::DisconnectError { steam_id, error }]
                    }
                    Err(e) => {
                        error!(steam_id = %steam_id, error = %e, "disconnect sync failed");
                        vec![ServerFrame::DisconnectError {
                            steam_id,
                            error: "transient".to_string(),
                        }]
                    }
                }
            }

            ClientFrame::PlayerCrashRecovery(doc) => {
                let steam_id = doc.steam_id.clone();
                let outcome = self.engine.crash_recovery(&doc, &self.server).await;
                vec![recovery_frame(steam_id, outcome)]
            }

            ClientFrame::PlayerBatchCrashRecovery { players } => {
                self.handle_batch_recovery(players).await
            }
        }
    }

    async fn handle_connect(
        &mut self,
        steam_id: String,
        eos_id: Option<String>,
        name: Option<String>,
    ) -> Vec<ServerFrame> {
        match self
            .engine
            .connect(&steam_id, eos_id.as_deref(), name.as_deref(), &self.server)
            .await
        {
            Ok(ConnectOutcome::Granted { doc }) => {
                self.wait_attempts.remove(&steam_id);
                vec![ServerFrame::PlayerData {
                    steam_id,
                    sync_seq: doc.sync_seq,
                    data: doc,
                }]
            }
            Ok(ConnectOutcome::Wait {
                active_server,
                retry_after_ms,
                max_retries,
                ..
            }) => {
                let attempts = self.wait_attempts.entry(steam_id.clone()).or_insert(0);
                *attempts += 1;
                if *attempts > max_retries {
                    self.wait_attempts.remove(&steam_id);
                    warn!(
                        steam_id = %steam_id,
                        active_server = %active_server,
                        "connect retry limit reached"
                    );
                    vec![ServerFrame::PlayerError {
                        steam_id,
                        error: format!(
                            "connect retry limit reached; player still active on {}",
                            active_server
                        ),
                    }]
                } else {
                    vec![ServerFrame::PlayerWait {
                        steam_id,
                        active_server,
                        retry_after_ms,
                        max_retries,
                    }]
                }
            }
            Ok(ConnectOutcome::Rejected { reason }) => {
                vec![ServerFrame::PlayerError { steam_id, error: reason }]
            }
            Err(e) => {
                error!(steam_id = %steam_id, error = %e, "connect failed");
                vec![ServerFrame::PlayerError {
                    steam_id,
                    error: "transient".to_string(),
                }]
            }
        }
    }

    /// Per-entry recovery frames followed by the batch summary. Entries
    /// beyond the batch cap are refused without touching the rest.
    async fn handle_batch_recovery(
        &mut self,
        players: Vec<roster_core::PlayerDoc>,
    ) -> Vec<ServerFrame> {
        let total = players.len();
        let mut frames = Vec::with_capacity(total + 1);
        let mut successful = 0usize;

        for (index, doc) in players.into_iter().enumerate() {
            let steam_id = doc.steam_id.clone();
            if index >= MAX_BATCH_RECOVERY {
                frames.push(ServerFrame::RecoveryError {
                    steam_id,
                    error: format!("batch limit {} exceeded", MAX_BATCH_RECOVERY),
                });
                continue;
            }

            let outcome = self.engine.crash_recovery(&doc, &self.server).await;
            if matches!(
                &outcome,
                Ok(SyncOutcome::Applied { .. }) | Ok(SyncOutcome::Skipped { .. })
            ) {
                successful += 1;
            }
            frames.push(recovery_frame(steam_id, outcome));
        }

        info!(
            server_id = %self.server.server_id,
            total,
            successful,
            failed = total - successful,
            "batch crash recovery handled"
        );
        frames.push(ServerFrame::BatchRecoveryComplete {
            total,
            successful,
            failed: total - successful,
        });
        frames
    }
}

fn recovery_frame(
    steam_id: String,
    outcome: Result<SyncOutcome, roster_db::StoreError>,
) -> ServerFrame {
    match outcome {
        Ok(SyncOutcome::Applied { sync_seq, flagged, .. }) => ServerFrame::RecoveryAck {
            steam_id,
            sync_seq,
            skipped: None,
            reason: None,
            flagged: Some(flagged),
        },
        Ok(SyncOutcome::Skipped { reason }) => ServerFrame::RecoveryAck {
            steam_id,
            sync_seq: 0,
            skipped: Some(true),
            reason: Some(reason),
            flagged: None,
        },
        Ok(outcome) => {
            let (error, _) = sync_error_text(&outcome);
            ServerFrame::RecoveryError { steam_id, error }
        }
        Err(e) => {
            error!(steam_id = %steam_id, error = %e, "crash recovery failed");
            ServerFrame::RecoveryError {
                steam_id,
                error: "transient".to_string(),
            }
        }
    }
}

/// Map a refusal outcome onto its wire error string
fn sync_error_text(outcome: &SyncOutcome) -> (String, Option<Vec<String>>) {
    match outcome {
        SyncOutcome::ValidationFailed { errors } => {
            ("validation_failed".to_string(), Some(errors.clone()))
        }
        SyncOutcome::PlayerNotFound => ("player_not_found".to_string(), None),
        SyncOutcome::NotSessionOwner { active_server } => (
            format!(
                "not_session_owner: active on {}",
                active_server.as_deref().unwrap_or("none")
            ),
            None,
        ),
        SyncOutcome::InvalidSyncSeq { expected_seq } => {
            (format!("invalid_sync_seq: expected {}", expected_seq), None)
        }
        SyncOutcome::Skipped { reason } => (format!("skipped: {}", reason), None),
        SyncOutcome::Transient { error } => (format!("transient: {}", error), None),
        SyncOutcome::Applied { .. } => ("none".to_string(), None),
    }
}

/// Pump one authenticated WebSocket session: emit the handshake frames,
/// then translate inbound frames until the transport drops. The connection
/// is registered for cross-task lookup and the server's sessions are swept
/// when the loop ends, however it ends.
pub async fn run_session<S>(
    ws: WebSocketStream<S>,
    engine: Arc<SyncEngine>,
    registry: Registry,
    connections: Arc<ConnectionRegistry>,
    server: GameServerRecord,
    shutdown: Arc<RwLock<bool>>,
) -> NetResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server_id = server.server_id.clone();
    let (tx, rx) = mpsc::channel::<ServerFrame>(256);
    connections.register(&server_id, tx).await;

    let result = pump(ws, engine, registry.clone(), server, rx, shutdown).await;

    connections.remove(&server_id).await;
    match registry.sweep_server(&server_id).await {
        Ok(swept) => {
            if swept > 0 {
                info!(server_id = %server_id, count = swept, "released sessions after transport loss");
            }
        }
        Err(e) => error!(server_id = %server_id, error = %e, "session sweep failed"),
    }
    result
}

async fn pump<S>(
    ws: WebSocketStream<S>,
    engine: Arc<SyncEngine>,
    registry: Registry,
    server: GameServerRecord,
    mut outbound: mpsc::Receiver<ServerFrame>,
    shutdown: Arc<RwLock<bool>>,
) -> NetResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws.split();

    let player_count = engine
        .store()
        .count_active_players(&server.server_id)
        .await
        .unwrap_or(0);
    send_frame(
        &mut write,
        &ServerFrame::AuthSuccess {
            server_id: server.server_id.clone(),
        },
    )
    .await?;
    send_frame(&mut write, &ServerFrame::ServerInfo { player_count }).await?;

    let mut session = Session::new(engine, registry, server);
    let mut shutdown_check = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = shutdown_check.tick() => {
                if *shutdown.read().await {
                    use futures_util::SinkExt;
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => send_frame(&mut write, &frame).await?,
                    None => return Ok(()),
                }
            }
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => {
                                for response in session.handle_frame(frame).await {
                                    send_frame(&mut write, &response).await?;
                                }
                            }
                            Err(e) => {
                                warn!(
                                    server_id = %session.server_id(),
                                    error = %e,
                                    "dropping unparseable frame"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(NetError::Connection(e.to_string())),
                }
            }
        }
    }
}
