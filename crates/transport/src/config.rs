//! Client configuration.

use std::time::Duration;

use crate::types::{DEBUG_PLAYER_ID, DEFAULT_RECONNECT_DELAY_MS};

/// Default server base URL
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000";

/// Default capacity of the bounded transport event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL without the `/ws/{player}` suffix.
    pub server_url: String,
    /// `None` uses the debug identity.
    pub player_id: Option<String>,
    pub reconnect_delay: Duration,
    /// Clamped to at least 1.
    pub event_capacity: usize,
    /// Append every frame to this file when set.
    pub wire_log_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            player_id: None,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            wire_log_path: None,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use idle_miner_transport::ClientConfig;
    ///
    /// let config = ClientConfig::from_lookup(|key| match key {
    ///     "IDLE_MINER_WS_URL" => Some("wss://game.example.com/".to_string()),
    ///     "IDLE_MINER_PLAYER_ID" => Some("42".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.endpoint(), "wss://game.example.com/ws/42");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .and_then(|s| if s.is_empty() { None } else { Some(s) })
        };

        let server_url = non_empty("IDLE_MINER_WS_URL").unwrap_or(defaults.server_url);
        let player_id = non_empty("IDLE_MINER_PLAYER_ID");

        let reconnect_delay = non_empty("IDLE_MINER_RECONNECT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_delay);

        let event_capacity = non_empty("IDLE_MINER_EVENT_CAPACITY")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.event_capacity)
            .max(1);

        let wire_log_path = non_empty("IDLE_MINER_WIRE_LOG");

        Self {
            server_url,
            player_id,
            reconnect_delay,
            event_capacity,
            wire_log_path,
        }
    }

    pub fn player_id(&self) -> &str {
        self.player_id.as_deref().unwrap_or(DEBUG_PLAYER_ID)
    }

    /// Full WebSocket endpoint: `{server_url}/ws/{player_id}`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/ws/{}",
            self.server_url.trim_end_matches('/'),
            self.player_id()
        )
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            endpoint: self.endpoint(),
            reconnect_delay: self.reconnect_delay,
            event_capacity: self.event_capacity.max(1),
            wire_log_path: self.wire_log_path.clone(),
        }
    }
}

/// What the transport manager itself needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub reconnect_delay: Duration,
    pub event_capacity: usize,
    pub wire_log_path: Option<String>,
}

impl TransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            wire_log_path: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}
