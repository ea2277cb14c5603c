//! Private (authenticated) WebSocket manager.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::auth::{Credentials, RequestSigner, SystemTimestamp, TimestampProvider};
use crate::error::OrderlyError;
use crate::ws::client::{endpoints, WsConfig};
use crate::ws::manager::{WsAuthenticator, WsTopicManager};
use crate::ws::messages::topics;

/// WebSocket manager for private account streams.
///
/// Every private subscription is preceded by a freshly-signed authentication
/// frame, both on the initial connect and on every replay after a reconnect.
///
/// # Example
///
/// ```rust,no_run
/// use orderly_api_client::auth::Credentials;
/// use orderly_api_client::ws::PrivateWsManager;
///
/// # async fn run() -> Result<(), orderly_api_client::OrderlyError> {
/// let ws = PrivateWsManager::builder()
///     .credentials(Credentials::new(
///         "<your account id>",
///         "<your orderly key>",
///         "<your orderly secret>",
///     ))
///     .build()?;
///
/// ws.subscribe("position");
/// ws.start();
///
/// let position = ws.recv("position").await?;
/// println!("{position}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PrivateWsManager {
    core: WsTopicManager,
}

impl PrivateWsManager {
    /// Create a builder for the private manager.
    pub fn builder() -> PrivateWsManagerBuilder {
        PrivateWsManagerBuilder::new()
    }

    /// Start the connection task (non-blocking).
    pub fn start(&self) {
        self.core.start();
    }

    /// Stop the manager and wait for the connection task to end.
    pub async fn stop(&self) {
        self.core.stop().await;
    }

    /// Register a topic queue; it is subscribed (with a fresh login) on
    /// every (re)connect.
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

    /// Authenticate the live session (connection required).
    pub fn login(&self) -> Result<(), OrderlyError> {
        self.core.send_login()
    }

    /// Subscribe to position updates.
    pub fn subscribe_position(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::POSITION)
    }

    /// Subscribe to balance updates.
    pub fn subscribe_balance(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::BALANCE)
    }

    /// Subscribe to order status updates.
    pub fn subscribe_order(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::ORDER)
    }

    /// Subscribe to private trade fills.
    pub fn subscribe_trade(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::TRADE)
    }

    /// Subscribe to liquidation events.
    pub fn subscribe_liquidation(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::LIQUIDATION)
    }

    /// Subscribe to profit-and-loss updates.
    pub fn subscribe_pnl(&self) -> Result<(), OrderlyError> {
        self.subscribe_private(topics::PNL)
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

    fn subscribe_private(&self, topic: &str) -> Result<(), OrderlyError> {
        self.core.subscribe(topic);
        self.login()?;
        self.core.send_subscribe(topic)
    }
}

/// Builder for [`PrivateWsManager`].
pub struct PrivateWsManagerBuilder {
    endpoint: String,
    credentials: Option<Credentials>,
    client_id: String,
    config: WsConfig,
    timestamps: Arc<dyn TimestampProvider>,
}

impl PrivateWsManagerBuilder {
    /// Create a new builder targeting the mainnet endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: endpoints::WS_PRIVATE.to_string(),
            credentials: None,
            client_id: "WS_PRIVATE".to_string(),
            config: WsConfig::default(),
            timestamps: Arc::new(SystemTimestamp),
        }
    }

    /// Set the API credentials (required).
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Target the testnet endpoint.
    pub fn testnet(mut self) -> Self {
        self.endpoint = endpoints::WS_PRIVATE_TESTNET.to_string();
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

    /// Set the timestamp source used for authentication (useful for testing).
    pub fn timestamp_provider(mut self, timestamps: Arc<dyn TimestampProvider>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Build the manager, deriving the signing key from the secret.
    pub fn build(self) -> Result<PrivateWsManager, OrderlyError> {
        let credentials = self.credentials.ok_or(OrderlyError::MissingCredentials)?;
        let signer = RequestSigner::from_base58_secret(credentials.expose_secret())?;
        let url = format!("{}{}", self.endpoint, credentials.account_id);
        Url::parse(&url)?;

        let auth = WsAuthenticator {
            orderly_key: credentials.orderly_key.clone(),
            signer,
            timestamps: self.timestamps,
        };

        Ok(PrivateWsManager {
            core: WsTopicManager::new(self.client_id, url, self.config, Some(auth)),
        })
    }
}

impl Default for PrivateWsManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
