//! Application state for the API server

use std::sync::Arc;

use roster_core::GameServerRecord;
use roster_db::{Registry, SqlAuditSink, SyncEngine, SyncStore};

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Shared sync engine
    pub engine: Arc<SyncEngine>,
    /// Store, for read-side handlers
    pub store: Arc<SyncStore>,
    /// Game-server registry
    pub registry: Registry,
    /// Synthetic origin record stamped on audit entries from this surface
    pub api_origin: GameServerRecord,
    /// Shared secret for the `X-API-Key` header
    pub api_key: String,
    /// API version
    pub version: String,
}

impl AppState {
    /// Create new app state over an initialized store
    pub fn new(store: Arc<SyncStore>, api_key: String) -> Self {
        let registry = Registry::new(store.pool().clone());
        let engine = Arc::new(SyncEngine::new(store.clone(), Arc::new(SqlAuditSink)));
        Self {
            engine,
            store,
            registry,
            api_origin: GameServerRecord::api_origin(),
            api_key,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_key: String::new(),
            enable_cors: false,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// - SYNC_API_HOST / SYNC_API_PORT: bind address
    /// - SYNC_API_KEY: shared secret for the HTTP surface
    /// - SYNC_API_CORS: enable permissive CORS (true/false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("SYNC_API_HOST").unwrap_or(defaults.host),
            port: std::env::var("SYNC_API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            api_key: std::env::var("SYNC_API_KEY").unwrap_or_default(),
            enable_cors: std::env::var("SYNC_API_CORS")
                .map(|s| s.to_lowercase() == "true" || s == "1")
                .unwrap_or(false),
        }
    }
}
