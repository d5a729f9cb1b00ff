//! Connector configuration
//!
//! Loaded from environment variables, with the reconnect back-off shape
//! tunable per deployment.

use roster_core::constants::{RECONNECT_DELAY_MAX_MS, RECONNECT_DELAY_MS, REQUEST_TIMEOUT_SECS};

/// One configured game server: the URL the connector dials and the token
/// it presents
#[derive(Debug, Clone, PartialEq)]
pub struct GameServerEndpoint {
    pub url: String,
    pub token: String,
}

/// Connector fleet configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Endpoints the connector dials
    pub endpoints: Vec<GameServerEndpoint>,
    /// Reconnect attempt cap; `None` retries forever
    pub reconnect_attempts: Option<u32>,
    /// Base reconnect delay in milliseconds
    pub reconnect_delay_ms: u64,
    /// Reconnect delay ceiling in milliseconds
    pub reconnect_delay_max_ms: u64,
    /// Per-request wait on a game-server response, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            reconnect_attempts: None,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            reconnect_delay_max_ms: RECONNECT_DELAY_MAX_MS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ConnectorConfig {
    /// Load configuration from environment variables
    ///
    /// - GAME_SERVERS: comma list of `url|token` pairs
    /// - GAME_SERVER_RECONNECT_ATTEMPTS: attempt cap, 0 = retry forever
    /// - GAME_SERVER_RECONNECT_DELAY: base delay in milliseconds
    /// - GAME_SERVER_RECONNECT_DELAY_MAX: delay ceiling in milliseconds
    /// - GAME_SERVER_RECONNECT_TIMEOUT: per-request timeout in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoints = std::env::var("GAME_SERVERS")
            .map(|s| parse_game_servers(&s))
            .unwrap_or_default();

        let reconnect_attempts = std::env::var("GAME_SERVER_RECONNECT_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|&n| n > 0);

        Self {
            endpoints,
            reconnect_attempts,
            reconnect_delay_ms: std::env::var("GAME_SERVER_RECONNECT_DELAY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconnect_delay_ms),
            reconnect_delay_max_ms: std::env::var("GAME_SERVER_RECONNECT_DELAY_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconnect_delay_max_ms),
            request_timeout_secs: std::env::var("GAME_SERVER_RECONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

/// Parse a `url|token` comma list; malformed entries are dropped
pub fn parse_game_servers(value: &str) -> Vec<GameServerEndpoint> {
    value
        .split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (url, token) = pair.split_once('|')?;
            if url.is_empty() || token.is_empty() {
                return None;
            }
            Some(GameServerEndpoint {
                url: url.trim().to_string(),
                token: token.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_servers() {
        let endpoints = parse_game_servers(
            "ws://10.0.0.1:8081|tokenA, ws://10.0.0.2:8081|tokenB",
        );
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url, "ws://10.0.0.1:8081");
        assert_eq!(endpoints[0].token, "tokenA");
        assert_eq!(endpoints[1].token, "tokenB");
    }

    #[test]
    fn test_parse_drops_malformed_entries() {
        let endpoints = parse_game_servers("ws://ok|tok,,missing-token,|empty-url");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].url, "ws://ok");
    }

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert!(config.reconnect_attempts.is_none());
        assert_eq!(config.reconnect_delay_ms, 1_000);
        assert_eq!(config.reconnect_delay_max_ms, 30_000);
        assert_eq!(config.request_timeout_secs, 10);
    }
}
