//! Storage layer and sync engine
//!
//! Decomposes the v2 player document into the relational model and back
//! inside a single transaction boundary, owns the game-server registry, and
//! hosts the `SyncEngine` that enforces the session/conflict protocol.
//!
//! The store exposes narrow, typed primitives that *join* a transaction
//! supplied by the engine; it never opens one itself. Tests run against an
//! in-memory SQLite database.

pub mod audit;
pub mod engine;
pub mod entities;
pub mod error;
pub mod registry;
pub mod schema;
pub mod store;

pub use audit::{AuditSink, MemoryAuditSink, SqlAuditSink};
pub use engine::SyncEngine;
pub use error::{StoreError, StoreResult};
pub use registry::{Registry, ResolvedServer};
pub use schema::ROSTER_SCHEMA;
pub use store::{DbConfig, SyncStore};
