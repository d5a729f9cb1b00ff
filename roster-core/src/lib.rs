//! Core domain model for the player-state sync service.
//!
//! This crate holds everything the storage, network, and API layers agree
//! on: the canonical v2 player document, document validation, per-sync delta
//! limits, the tagged operation outcomes, and the protocol constants.
//!
//! Nothing in here touches a database or a socket. The sync rules are plain
//! functions over plain data so they can be tested in isolation and reused
//! by every entry point (WebSocket control plane and HTTP surface alike).

pub mod constants;
pub mod delta;
pub mod logging;
pub mod types;
pub mod validation;

pub use types::audit::{AuditEntry, SyncKind};
pub use types::document::{LoadoutEntry, PlayerDoc, SkinsDoc, StatsDoc, TrackingDoc};
pub use types::outcome::{BatchEntryResult, BatchSummary, ConnectOutcome, SyncOutcome};
pub use types::server::GameServerRecord;

/// Core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
