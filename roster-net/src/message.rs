//! Wire message catalog
//!
//! Frames are JSON envelopes `{"event": ..., "data": ...}`. Inbound events
//! come from the game server; outbound acks and errors flow back from the
//! service. Payload fields are camelCase on the wire.

use futures_util::{Sink, SinkExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

use roster_core::PlayerDoc;

use crate::error::{NetError, NetResult};

/// Frames sent by a game server to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    /// Token presentation; first frame of a listener-orientation session
    #[serde(rename = "auth")]
    Auth { token: String },

    #[serde(rename = "player:connect")]
    #[serde(rename_all = "camelCase")]
    PlayerConnect {
        steam_id: String,
        #[serde(default)]
        eos_id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },

    #[serde(rename = "player:sync")]
    PlayerSync(PlayerDoc),

    #[serde(rename = "player:disconnect")]
    PlayerDisconnect(PlayerDoc),

    #[serde(rename = "player:crash-recovery")]
    PlayerCrashRecovery(PlayerDoc),

    #[serde(rename = "player:batch-crash-recovery")]
    PlayerBatchCrashRecovery { players: Vec<PlayerDoc> },
}

/// Frames sent by the service to a game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    #[serde(rename = "auth:success")]
    #[serde(rename_all = "camelCase")]
    AuthSuccess { server_id: String },

    #[serde(rename = "auth:error")]
    AuthError { error: String },

    #[serde(rename = "server:info")]
    #[serde(rename_all = "camelCase")]
    ServerInfo { player_count: i64 },

    /// Connect response; `data` never carries tracking
    #[serde(rename = "player:data")]
    #[serde(rename_all = "camelCase")]
    PlayerData {
        steam_id: String,
        data: PlayerDoc,
        sync_seq: i64,
    },

    #[serde(rename = "player:wait")]
    #[serde(rename_all = "camelCase")]
    PlayerWait {
        steam_id: String,
        active_server: String,
        retry_after_ms: u64,
        max_retries: u32,
    },

    #[serde(rename = "player:error")]
    #[serde(rename_all = "camelCase")]
    PlayerError { steam_id: String, error: String },

    #[serde(rename = "sync:ack")]
    #[serde(rename_all = "camelCase")]
    SyncAck {
        steam_id: String,
        sync_seq: i64,
        flagged: bool,
    },

    #[serde(rename = "sync:error")]
    #[serde(rename_all = "camelCase")]
    SyncError {
        steam_id: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
    },

    #[serde(rename = "disconnect:ack")]
    #[serde(rename_all = "camelCase")]
    DisconnectAck { steam_id: String, sync_seq: i64 },

    #[serde(rename = "disconnect:error")]
    #[serde(rename_all = "camelCase")]
    DisconnectError { steam_id: String, error: String },

    #[serde(rename = "recovery:ack")]
    #[serde(rename_all = "camelCase")]
    RecoveryAck {
        steam_id: String,
        sync_seq: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skipped: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flagged: Option<bool>,
    },

    #[serde(rename = "recovery:error")]
    #[serde(rename_all = "camelCase")]
    RecoveryError { steam_id: String, error: String },

    #[serde(rename = "batch-recovery:complete")]
    #[serde(rename_all = "camelCase")]
    BatchRecoveryComplete {
        total: usize,
        successful: usize,
        failed: usize,
    },
}

/// Serialize a frame and push it down a WebSocket sink
pub async fn send_frame<S>(sink: &mut S, frame: &ServerFrame) -> NetResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text =
        serde_json::to_string(frame).map_err(|e| NetError::Serialization(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| NetError::SendFailed(e.to_string()))
}
