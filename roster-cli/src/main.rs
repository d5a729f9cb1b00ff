//! Player-state sync service CLI
//!
//! Usage:
//!   roster init                      - apply the database schema
//!   roster add-server --server-id X  - register a game server, print its token
//!   roster deactivate-server --server-id X - revoke a server's token
//!   roster list-servers              - show registered game servers
//!   roster prune-audit --days N      - drop old non-flagged audit entries
//!   roster start                     - run connectors, listener, and the API

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use roster_api::{run_server, ApiConfig};
use roster_db::{DbConfig, Registry, SqlAuditSink, SyncEngine, SyncStore};
use roster_net::{spawn_connectors, ConnectionRegistry, ConnectorConfig, WsListener};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Multi-tenant player-state sync service")]
#[command(version)]
struct Cli {
    /// Database URL (overrides DB_URL)
    #[arg(long)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the database schema
    Init,

    /// Register a game server and print its API token
    AddServer {
        /// Unique server identifier
        #[arg(long)]
        server_id: String,
    },

    /// Deactivate a game server so its token no longer authenticates
    DeactivateServer {
        /// Unique server identifier
        #[arg(long)]
        server_id: String,
    },

    /// List registered game servers
    ListServers,

    /// Drop non-flagged audit entries older than the horizon
    PruneAudit {
        /// Retention horizon in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    /// Run the sync service
    Start {
        /// API host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// API port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Also accept inbound game-server connections on this address
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut db_config = DbConfig::from_env();
    if let Some(url) = cli.db_url {
        db_config.url = url;
    }

    let store = Arc::new(SyncStore::connect(&db_config).await?);
    store.init_schema().await?;
    let registry = Registry::new(store.pool().clone());

    match cli.command {
        Commands::Init => {
            info!("schema initialized");
        }

        Commands::AddServer { server_id } => {
            let (record, token) = registry.register_server(&server_id).await?;
            println!("registered {}", record.server_id);
            println!("token: {}", token);
        }

        Commands::DeactivateServer { server_id } => {
            registry.set_active(&server_id, false).await?;
            // Release anyone still pinned so no player points at an
            // inactive server
            let swept = registry.sweep_server(&server_id).await?;
            println!("deactivated {} ({} active sessions released)", server_id, swept);
        }

        Commands::ListServers => {
            for server in registry.list_servers().await? {
                println!(
                    "{}\tactive={}\tflagged={}\tlast_seen={}",
                    server.server_id,
                    server.active,
                    server.flagged,
                    server
                        .last_seen
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
        }

        Commands::PruneAudit { days } => {
            let pruned = store.prune_audit_log(days).await?;
            println!("pruned {} audit entries older than {} days", pruned, days);
        }

        Commands::Start { host, port, listen } => {
            let engine = Arc::new(SyncEngine::new(store.clone(), Arc::new(SqlAuditSink)));
            let connections = Arc::new(ConnectionRegistry::new());
            let shutdown = Arc::new(RwLock::new(false));

            let connector_config = ConnectorConfig::from_env();
            info!(
                endpoints = connector_config.endpoints.len(),
                "starting game server connectors"
            );
            let _connector_tasks = spawn_connectors(
                &connector_config,
                engine.clone(),
                registry.clone(),
                connections.clone(),
                shutdown.clone(),
            );

            if let Some(addr) = listen {
                let listener = WsListener::new(
                    addr,
                    connector_config.request_timeout_secs,
                    engine.clone(),
                    registry.clone(),
                    connections.clone(),
                    shutdown.clone(),
                );
                tokio::spawn(async move {
                    if let Err(e) = listener.run().await {
                        tracing::error!(error = %e, "game server listener failed");
                    }
                });
            }

            let mut api_config = ApiConfig::from_env();
            if let Some(host) = host {
                api_config.host = host;
            }
            if let Some(port) = port {
                api_config.port = port;
            }
            run_server(&api_config, store).await?;
        }
    }

    Ok(())
}
