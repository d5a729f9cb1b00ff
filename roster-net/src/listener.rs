//! Reverse-orientation listener
//!
//! Some deployments have the game server dial the service instead. The
//! listener accepts those connections, requires an `auth` frame carrying
//! the token as the first message, then runs the same session loop as the
//! outbound connector.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use roster_db::{Registry, ResolvedServer, SyncEngine};

use crate::error::{NetError, NetResult};
use crate::message::{send_frame, ClientFrame, ServerFrame};
use crate::registry::ConnectionRegistry;
use crate::session::run_session;

/// Accepts inbound game-server connections
pub struct WsListener {
    bind_addr: String,
    request_timeout_secs: u64,
    engine: Arc<SyncEngine>,
    registry: Registry,
    connections: Arc<ConnectionRegistry>,
    shutdown: Arc<RwLock<bool>>,
}

impl WsListener {
    pub fn new(
        bind_addr: impl Into<String>,
        request_timeout_secs: u64,
        engine: Arc<SyncEngine>,
        registry: Registry,
        connections: Arc<ConnectionRegistry>,
        shutdown: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            request_timeout_secs,
            engine,
            registry,
            connections,
            shutdown,
        }
    }

    /// Accept loop; each connection gets its own task
    pub async fn run(&self) -> NetResult<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "game server listener started");

        loop {
            if *self.shutdown.read().await {
                return Ok(());
            }

            let (stream, addr) = listener.accept().await?;
            let engine = self.engine.clone();
            let registry = self.registry.clone();
            let connections = self.connections.clone();
            let shutdown = self.shutdown.clone();
            let handshake_timeout = self.request_timeout_secs;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(
                    stream,
                    handshake_timeout,
                    engine,
                    registry,
                    connections,
                    shutdown,
                )
                .await
                {
                    warn!(addr = %addr, error = %e, "game server connection ended with error");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    handshake_timeout_secs: u64,
    engine: Arc<SyncEngine>,
    registry: Registry,
    connections: Arc<ConnectionRegistry>,
    shutdown: Arc<RwLock<bool>>,
) -> NetResult<()> {
    let mut ws = accept_async(stream)
        .await
        .map_err(|e| NetError::Connection(e.to_string()))?;

    // The first frame must present the token, within the request timeout
    let first = timeout(Duration::from_secs(handshake_timeout_secs), ws.next())
        .await
        .map_err(|_| NetError::Timeout("auth handshake".to_string()))?
        .ok_or_else(|| NetError::Connection("closed before auth".to_string()))?
        .map_err(|e| NetError::Connection(e.to_string()))?;

    let token = match first {
        Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
            Ok(ClientFrame::Auth { token }) => token,
            Ok(_) => {
                send_frame(
                    &mut ws,
                    &ServerFrame::AuthError {
                        error: "first frame must be auth".to_string(),
                    },
                )
                .await?;
                let _ = ws.send(Message::Close(None)).await;
                return Err(NetError::Unauthenticated("auth frame missing".to_string()));
            }
            Err(e) => return Err(NetError::InvalidFrame(e.to_string())),
        },
        _ => return Err(NetError::InvalidFrame("expected text frame".to_string())),
    };

    let server = match registry.resolve_token(&token).await? {
        ResolvedServer::Active(server) => server,
        ResolvedServer::Inactive(server) => {
            send_frame(
                &mut ws,
                &ServerFrame::AuthError {
                    error: "server deactivated".to_string(),
                },
            )
            .await?;
            let _ = ws.send(Message::Close(None)).await;
            return Err(NetError::Unauthenticated(format!(
                "game server {} is deactivated",
                server.server_id
            )));
        }
        ResolvedServer::NotFound => {
            send_frame(
                &mut ws,
                &ServerFrame::AuthError {
                    error: "invalid token".to_string(),
                },
            )
            .await?;
            let _ = ws.send(Message::Close(None)).await;
            return Err(NetError::Unauthenticated("unknown token".to_string()));
        }
    };

    info!(server_id = %server.server_id, "game server authenticated");
    run_session(ws, engine, registry, connections, server, shutdown).await
}
