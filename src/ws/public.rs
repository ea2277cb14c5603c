//! Public market-data WebSocket manager.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::OrderlyError;
use crate::ws::client::{endpoints, WsConfig};
use crate::ws::manager::WsTopicManager;
use crate::ws::messages::topics;

/// WebSocket manager for public market-data streams.
///
/// # Example
///
/// ```rust,no_run
/// use orderly_api_client::ws::PublicWsManager;
///
/// # async fn run() -> Result<(), orderly_api_client::OrderlyError> {
/// let ws = PublicWsManager::builder()
///     .account_id("<your account id>")
///     .build()?;
///
/// ws.subscribe("bbos");
/// ws.start();
///
/// let bbos = ws.recv("bbos").await?;
/// println!("{bbos}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PublicWsManager {
    core: WsTopicManager,
}

impl PublicWsManager {
    /// Create a builder for the public manager.
    pub fn builder() -> PublicWsManagerBuilder {
        PublicWsManagerBuilder::new()
    }

    /// Start the connection task (non-blocking).
    pub fn start(&self) {
        self.core.start();
    }

    /// Stop the manager and wait for the connection task to end.
    pub async fn stop(&self) {
        self.core.stop().await;
    }

    /// Register a topic queue; it is subscribed on every (re)connect.
    pub fn subscribe(&self, topic: &str) {
        self.core.subscribe(topic);
    }

    /// Send a subscribe request for a topic (connection required).
    pub fn send_subscribe(&self, topic: &str) -> Result<(), OrderlyError> {
        self.core.send_subscribe(topic)
    }

    /// Unsubscribe from a topic and drop its queue (connection required).
    pub fn unsubscribe(&self, topic: &str) -> Result<(), OrderlyError> {
        self.core.unsubscribe(topic)
    }

    /// Request an orderbook snapshot, delivered to `{symbol}@orderbook`.
    pub fn request_orderbook(&self, symbol: &str) -> Result<(), OrderlyError> {
        self.core.request_orderbook(symbol)
    }

    /// Receive the next message for a topic.
    pub async fn recv(&self, topic: &str) -> Result<Value, OrderlyError> {
        self.core.recv(topic).await
    }

    /// Receive the next message for a topic with a custom stall-log interval.
    pub async fn recv_with_timeout(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Value, OrderlyError> {
        self.core.recv_with_timeout(topic, timeout).await
    }

    /// Subscribe to best bid/offer updates for all symbols.
    pub fn subscribe_bbos(&self) -> Result<(), OrderlyError> {
        self.subscribe_topic(topics::BBOS)
    }

    /// Subscribe to 24-hour tickers for all symbols.
    pub fn subscribe_24h_tickers(&self) -> Result<(), OrderlyError> {
        self.subscribe_topic(topics::TICKERS_24H)
    }

    /// Subscribe to the trade stream for a symbol.
    pub fn subscribe_trade(&self, symbol: &str) -> Result<(), OrderlyError> {
        self.subscribe_topic(&topics::trade(symbol))
    }

    /// Subscribe to orderbook updates for a symbol.
    pub fn subscribe_orderbook(&self, symbol: &str) -> Result<(), OrderlyError> {
        self.subscribe_topic(&topics::orderbook(symbol))
    }

    /// Subscribe to the 24-hour ticker for a symbol.
    pub fn subscribe_24h_ticker(&self, symbol: &str) -> Result<(), OrderlyError> {
        self.subscribe_topic(&topics::ticker_24h(symbol))
    }

    /// Subscribe to kline data for a symbol and interval (e.g. `1m`, `1h`).
    pub fn subscribe_kline(&self, symbol: &str, interval: &str) -> Result<(), OrderlyError> {
        self.subscribe_topic(&topics::kline(symbol, interval))
    }

    /// Whether a session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Names of all registered topics.
    pub fn topics(&self) -> Vec<String> {
        self.core.topics()
    }

    /// The full endpoint URL, account id included.
    pub fn url(&self) -> &str {
        self.core.url()
    }

    /// The connection configuration.
    pub fn config(&self) -> &WsConfig {
        self.core.config()
    }

    fn subscribe_topic(&self, topic: &str) -> Result<(), OrderlyError> {
        self.core.subscribe(topic);
        self.core.send_subscribe(topic)
    }
}

/// Builder for [`PublicWsManager`].
#[derive(Debug, Clone)]
pub struct PublicWsManagerBuilder {
    endpoint: String,
    account_id: Option<String>,
    client_id: String,
    config: WsConfig,
}

impl PublicWsManagerBuilder {
    /// Create a new builder targeting the mainnet endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: endpoints::WS_PUBLIC.to_string(),
            account_id: None,
            client_id: "WS_PUBLIC".to_string(),
            config: WsConfig::default(),
        }
    }

    /// Set the account id (required). It is appended to the endpoint URL.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Target the testnet endpoint.
    pub fn testnet(mut self) -> Self {
        self.endpoint = endpoints::WS_PUBLIC_TESTNET.to_string();
        self
    }

    /// Set a custom endpoint URL (useful for testing). The account id is
    /// appended verbatim, so include a trailing slash.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the client identifier echoed in control messages.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the connection configuration.
    pub fn config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the manager.
    pub fn build(self) -> Result<PublicWsManager, OrderlyError> {
        let account_id = self
            .account_id
            .ok_or_else(|| OrderlyError::Auth("account id is required".to_string()))?;
        let url = format!("{}{}", self.endpoint, account_id);
        Url::parse(&url)?;

        Ok(PublicWsManager {
            core: WsTopicManager::new(self.client_id, url, self.config, None),
        })
    }
}

impl Default for PublicWsManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_appends_account_id() {
        let ws = PublicWsManager::builder().account_id("0xabc").build().unwrap();
        assert_eq!(ws.url(), "wss://ws-evm.orderly.org/ws/stream/0xabc");
    }

    #[test]
    fn test_builder_requires_account_id() {
        assert!(PublicWsManager::builder().build().is_err());
    }

    #[test]
    fn test_builder_testnet() {
        let ws = PublicWsManager::builder()
            .testnet()
            .account_id("0xabc")
            .build()
            .unwrap();
        assert_eq!(ws.url(), "wss://testnet-ws-evm.orderly.org/ws/stream/0xabc");
    }

    #[test]
    fn test_builder_rejects_invalid_endpoint() {
        assert!(PublicWsManager::builder()
            .endpoint("not a url/")
            .account_id("0xabc")
            .build()
            .is_err());
    }
}
