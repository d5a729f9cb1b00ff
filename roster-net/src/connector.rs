//! Outbound game-server connector
//!
//! One connector per configured `url|token` pair. Dials the game server,
//! presents the token in the handshake, verifies it against the registry,
//! then hands the socket to the shared session loop. Reconnects with
//! exponential backoff until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_tungstenite::connect_async;
use tracing::{error, info, warn};

use roster_db::{Registry, ResolvedServer, SyncEngine};

use crate::config::{ConnectorConfig, GameServerEndpoint};
use crate::error::{NetError, NetResult};
use crate::registry::ConnectionRegistry;
use crate::session::run_session;

/// Maintains one outbound WebSocket to a game server
pub struct Connector {
    endpoint: GameServerEndpoint,
    config: ConnectorConfig,
    engine: Arc<SyncEngine>,
    registry: Registry,
    connections: Arc<ConnectionRegistry>,
    shutdown: Arc<RwLock<bool>>,
}

impl Connector {
    pub fn new(
        endpoint: GameServerEndpoint,
        config: ConnectorConfig,
        engine: Arc<SyncEngine>,
        registry: Registry,
        connections: Arc<ConnectionRegistry>,
        shutdown: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            endpoint,
            config,
            engine,
            registry,
            connections,
            shutdown,
        }
    }

    /// Dial-and-reconnect loop. Returns when shut down or when the attempt
    /// cap (if any) is exhausted.
    pub async fn run(&self) {
        let mut attempts: u32 = 0;
        let mut delay = self.config.reconnect_delay_ms;

        loop {
            if *self.shutdown.read().await {
                break;
            }

            match self.run_once().await {
                Ok(()) => {
                    // Clean session end; start the backoff ladder over
                    attempts = 0;
                    delay = self.config.reconnect_delay_ms;
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        url = %self.endpoint.url,
                        error = %e,
                        attempts,
                        "game server connection lost"
                    );
                    if let Some(cap) = self.config.reconnect_attempts {
                        if attempts >= cap {
                            error!(
                                url = %self.endpoint.url,
                                attempts,
                                "reconnect attempt cap exhausted, giving up"
                            );
                            break;
                        }
                    }
                }
            }

            if *self.shutdown.read().await {
                break;
            }

            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(self.config.reconnect_delay_max_ms);
        }
    }

    async fn run_once(&self) -> NetResult<()> {
        let server = match self.registry.resolve_token(&self.endpoint.token).await? {
            ResolvedServer::Active(server) => server,
            ResolvedServer::Inactive(server) => {
                return Err(NetError::Unauthenticated(format!(
                    "game server {} is deactivated",
                    server.server_id
                )));
            }
            ResolvedServer::NotFound => {
                return Err(NetError::Unauthenticated(
                    "configured token matches no registered game server".to_string(),
                ));
            }
        };

        let url = format!("{}?token={}", self.endpoint.url, self.endpoint.token);
        let (ws, _response) = connect_async(&url)
            .await
            .map_err(|e| NetError::Connection(e.to_string()))?;

        info!(
            server_id = %server.server_id,
            url = %self.endpoint.url,
            "connected to game server"
        );

        run_session(
            ws,
            self.engine.clone(),
            self.registry.clone(),
            self.connections.clone(),
            server,
            self.shutdown.clone(),
        )
        .await
    }
}

/// Spawn the connector fleet for every configured endpoint
pub fn spawn_connectors(
    config: &ConnectorConfig,
    engine: Arc<SyncEngine>,
    registry: Registry,
    connections: Arc<ConnectionRegistry>,
    shutdown: Arc<RwLock<bool>>,
) -> Vec<tokio::task::JoinHandle<()>> {
    config
        .endpoints
        .iter()
        .map(|endpoint| {
            let connector = Connector::new(
                endpoint.clone(),
                config.clone(),
                engine.clone(),
                registry.clone(),
                connections.clone(),
                shutdown.clone(),
            );
            tokio::spawn(async move { connector.run().await })
        })
        .collect()
}
