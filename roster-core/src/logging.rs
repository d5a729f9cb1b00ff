//! Logging conventions
//!
//! Structured-field and operation names used across the service so log
//! output stays greppable. All modules log through `tracing` with these
//! field names; free-form messages carry no key data.

/// Standard log field names
pub mod fields {
    /// Player steam identifier
    pub const STEAM_ID: &str = "steam_id";
    /// Game server identifier
    pub const SERVER_ID: &str = "server_id";
    /// Operation name
    pub const OPERATION: &str = "operation";
    /// Document sequence number
    pub const SYNC_SEQ: &str = "sync_seq";
    /// Operation duration in milliseconds
    pub const DURATION_MS: &str = "duration_ms";
    /// Error message
    pub const ERROR: &str = "error";
    /// Item count
    pub const COUNT: &str = "count";
}

/// Log operation categories for consistent naming
pub mod operations {
    pub const CONNECT: &str = "connect";
    pub const PERIODIC_SYNC: &str = "periodic_sync";
    pub const DISCONNECT: &str = "disconnect";
    pub const CRASH_RECOVERY: &str = "crash_recovery";
    pub const BATCH_RECOVERY: &str = "batch_recovery";
    pub const SWEEP: &str = "sweep";
    pub const AUTH: &str = "auth";
    pub const RECONNECT: &str = "reconnect";
}
