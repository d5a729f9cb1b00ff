//! WebSocket control plane
//!
//! One outbound connector per configured game server, plus a reverse
//! orientation listener for game servers that dial in. Both orientations
//! speak the same frame catalog and share the per-connection session loop
//! that translates frames into engine calls.

pub mod config;
pub mod connector;
pub mod error;
pub mod listener;
pub mod message;
pub mod registry;
pub mod session;

pub use config::{ConnectorConfig, GameServerEndpoint};
pub use connector::{spawn_connectors, Connector};
pub use error::{NetError, NetResult};
pub use listener::WsListener;
pub use message::{ClientFrame, ServerFrame};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use session::Session;
