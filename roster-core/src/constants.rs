//! Protocol Constants
//!
//! Centralized constants for the sync protocol. All magic numbers,
//! default values, and protocol-defined limits live here.

// ============================================================================
// Document format
// ============================================================================

/// The only supported player document version
pub const DOC_VERSION: u32 = 2;

/// Steam identifiers are exactly this many decimal digits
pub const STEAM_ID_DIGITS: usize = 17;

// ============================================================================
// Session lock
// ============================================================================

/// Session ownership expires this many seconds after `active_since`
/// with no further writes; a Connect after the window may claim the player.
pub const ACTIVE_SERVER_TIMEOUT_SECS: i64 = 30;

/// Delay advertised to a contending server in a `player:wait` response
pub const CONNECT_RETRY_AFTER_MS: u64 = 2_000;

/// How many wait-and-retry rounds a contending server gets before the
/// connect attempt is refused outright
pub const CONNECT_MAX_RETRIES: u32 = 5;

// ============================================================================
// Sequence validation
// ============================================================================

/// Maximum permitted forward jump of `sync_seq` during a periodic sync
pub const SEQ_TOLERANCE: i64 = 10;

/// Wider jump tolerance applied to crash recovery; violations flag
/// instead of rejecting because the originating session is already dead
pub const SEQ_TOLERANCE_RECOVERY: i64 = 100;

// ============================================================================
// Per-sync delta limits (flag, never reject)
// ============================================================================

/// Maximum currency earned in a single sync window
pub const MAX_CURRENCY_GAIN: i64 = 50_000;

/// Maximum currency spent in a single sync window
pub const MAX_CURRENCY_SPENT: i64 = 50_000;

/// Maximum XP gained in a single sync window
pub const MAX_XP_GAIN: i64 = 100_000;

/// Prestige can rise by at most one level per sync
pub const MAX_PRESTIGE_GAIN: i64 = 1;

/// Maximum permanent tokens gained in a single sync window
pub const MAX_PERMA_TOKEN_GAIN: i64 = 10;

/// Maximum play time (seconds) accrued in a single sync window
pub const MAX_TIME_PLAYED_GAIN: i64 = 7_200;

// ============================================================================
// Resource caps and timeouts
// ============================================================================

/// Batch crash recovery is bounded at this many documents per call
pub const MAX_BATCH_RECOVERY: usize = 100;

/// Per-request wait on a game-server response
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Base reconnection delay for the game-server connector
pub const RECONNECT_DELAY_MS: u64 = 1_000;

/// Reconnection delay ceiling
pub const RECONNECT_DELAY_MAX_MS: u64 = 30_000;
