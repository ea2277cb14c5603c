//! WebSocket endpoints and connection configuration.

use std::time::Duration;

/// WebSocket endpoint URLs.
///
/// The account id is appended to the endpoint when a manager is built.
pub mod endpoints {
    /// Public market-data endpoint (mainnet).
    pub const WS_PUBLIC: &str = "wss://ws-evm.orderly.org/ws/stream/";
    /// Public market-data endpoint (testnet).
    pub const WS_PUBLIC_TESTNET: &str = "wss://testnet-ws-evm.orderly.org/ws/stream/";
    /// Private (authenticated) endpoint (mainnet).
    pub const WS_PRIVATE: &str = "wss://ws-private-evm.orderly.org/v2/ws/private/stream/";
    /// Private (authenticated) endpoint (testnet).
    pub const WS_PRIVATE_TESTNET: &str =
        "wss://testnet-ws-private-evm.orderly.org/v2/ws/private/stream/";
}

/// Configuration for WebSocket connections.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Default interval after which [`recv`](crate::ws::WsTopicManager::recv)
    /// logs that a topic is still waiting. The wait itself never gives up.
    pub recv_timeout: Duration,
    /// Idle timeout for the read loop. If no frame arrives within this window
    /// the connection is considered dead and restarted (None = wait forever).
    pub read_timeout: Option<Duration>,
    /// Initial backoff duration for reconnection (zero = reconnect immediately).
    pub initial_backoff: Duration,
    /// Maximum backoff duration for reconnection.
    pub max_backoff: Duration,
    /// Maximum number of reconnection attempts (None = infinite).
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_secs(10),
            read_timeout: None, // Wait forever
            initial_backoff: Duration::ZERO, // Reconnect immediately
            max_backoff: Duration::from_secs(60),
            max_reconnect_attempts: None, // Infinite
        }
    }
}

impl WsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::new()
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug, Clone, Default)]
pub struct WsConfigBuilder {
    config: WsConfig,
}

impl WsConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WsConfig::default(),
        }
    }

    /// Set the default stall-log interval for `recv`.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout = timeout;
        self
    }

    /// Set the idle timeout after which a silent connection is restarted.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the reconnection backoff parameters.
    pub fn reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set maximum reconnection attempts.
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> WsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WsConfig::default();
        assert_eq!(config.recv_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.initial_backoff, Duration::ZERO);
        assert_eq!(config.max_backoff, Duration::from_secs(60));
        assert_eq!(config.max_reconnect_attempts, None);
    }

    #[test]
    fn test_config_builder() {
        let config = WsConfig::builder()
            .recv_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(30))
            .reconnect_backoff(Duration::from_millis(500), Duration::from_secs(20))
            .max_reconnect_attempts(3)
            .build();

        assert_eq!(config.recv_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.max_backoff, Duration::from_secs(20));
        assert_eq!(config.max_reconnect_attempts, Some(3));
    }
}
