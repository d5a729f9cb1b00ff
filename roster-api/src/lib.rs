//! HTTP surface
//!
//! Alternative entry points for offline tooling: health, single and batch
//! document upsert, sync status, and full document export. Everything but
//! health sits behind a shared-secret `X-API-Key` header. All operations
//! delegate to the same `SyncEngine` the WebSocket control plane uses.

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{create_server, run_server, start_background_server};
pub use state::{ApiConfig, AppState};
