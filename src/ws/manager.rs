//! Topic-multiplexed WebSocket manager.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::auth::{RequestSigner, TimestampProvider};
use crate::error::OrderlyError;
use crate::ws::client::WsConfig;
use crate::ws::messages::{topics, AuthRequest, OrderbookRequest, SubscribeRequest};
use crate::ws::registry::TopicRegistry;
use crate::ws::session;

/// Signs authentication frames for private streams.
pub(crate) struct WsAuthenticator {
    pub orderly_key: String,
    pub signer: RequestSigner,
    pub timestamps: Arc<dyn TimestampProvider>,
}

impl WsAuthenticator {
    /// Build a freshly-signed authentication frame.
    pub fn auth_request(&self, id: &str) -> AuthRequest {
        let timestamp = self.timestamps.timestamp_ms();
        let sign = self.signer.sign_base64(timestamp.to_string().as_bytes());
        AuthRequest::new(id, &self.orderly_key, sign, timestamp)
    }
}

/// Handle to the live session's outbound channel.
///
/// Every frame goes through the session's single writer task. When no
/// session is live, sends fail with [`OrderlyError::NotConnected`].
#[derive(Default)]
pub(crate) struct OutboundHandle {
    sender: Mutex<Option<UnboundedSender<WsMessage>>>,
}

impl OutboundHandle {
    fn lock(&self) -> MutexGuard<'_, Option<UnboundedSender<WsMessage>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn install(&self, tx: UnboundedSender<WsMessage>) {
        *self.lock() = Some(tx);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_connected(&self) -> bool {
        self.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn send(&self, message: WsMessage) -> Result<(), OrderlyError> {
        let guard = self.lock();
        let tx = guard.as_ref().ok_or(OrderlyError::NotConnected)?;
        tx.send(message).map_err(|_| OrderlyError::NotConnected)
    }
}

/// State shared between the manager handle and its connection task.
pub(crate) struct ManagerInner {
    pub client_id: String,
    pub url: String,
    pub config: WsConfig,
    pub registry: TopicRegistry,
    pub auth: Option<WsAuthenticator>,
    pub outbound: OutboundHandle,
    pub shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ManagerInner {
    /// Serialize a frame and enqueue it on the live session.
    pub fn send_frame<T: Serialize>(&self, frame: &T) -> Result<(), OrderlyError> {
        let json = serde_json::to_string(frame)?;
        debug!(client_id = %self.client_id, message = %json, "sending message");
        self.outbound.send(WsMessage::Text(json.into()))
    }
}

/// Core WebSocket manager multiplexing topic streams over one connection.
///
/// Incoming data frames are routed into per-topic queues and consumed with
/// [`recv`](Self::recv). The connection task reconnects automatically and
/// replays every registered subscription, so queues survive disconnects.
///
/// [`PublicWsManager`](crate::ws::PublicWsManager) and
/// [`PrivateWsManager`](crate::ws::PrivateWsManager) wrap this type with
/// endpoint defaults and per-topic convenience methods.
#[derive(Clone)]
pub struct WsTopicManager {
    inner: Arc<ManagerInner>,
}

impl WsTopicManager {
    pub(crate) fn new(
        client_id: String,
        url: String,
        config: WsConfig,
        auth: Option<WsAuthenticator>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ManagerInner {
                client_id,
                url,
                config,
                registry: TopicRegistry::new(),
                auth,
                outbound: OutboundHandle::default(),
                shutdown,
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the connection task (non-blocking).
    ///
    /// Topics registered before the first connection are subscribed as soon
    /// as it is established. Calling `start` twice has no effect.
    pub fn start(&self) {
        if *self.inner.shutdown.borrow() {
            warn!(client_id = %self.inner.client_id, "manager is stopped and cannot be restarted");
            return;
        }

        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!(client_id = %self.inner.client_id, "manager already started");
            return;
        }

        info!(client_id = %self.inner.client_id, url = %self.inner.url, "starting WebSocket manager");
        *task = Some(tokio::spawn(session::run(Arc::clone(&self.inner))));
    }

    /// Stop the manager: close the connection and wait for the task to end.
    ///
    /// Pending [`recv`](Self::recv) calls return [`OrderlyError::Stopped`].
    pub async fn stop(&self) {
        self.inner.shutdown.send_replace(true);
        let _ = self.inner.outbound.send(WsMessage::Close(None));

        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(client_id = %self.inner.client_id, error = %e, "connection task ended abnormally");
            }
        }
        info!(client_id = %self.inner.client_id, "WebSocket manager stopped");
    }

    /// Register a topic queue without touching the wire.
    ///
    /// Registering an already-known topic resets its queue, dropping any
    /// unread backlog. The connection task subscribes all registered topics
    /// on every (re)connect.
    pub fn subscribe(&self, topic: &str) {
        debug!(client_id = %self.inner.client_id, topic, "registering topic");
        self.inner.registry.subscribe(topic);
    }

    /// Send a subscribe request for a topic (connection required).
    pub fn send_subscribe(&self, topic: &str) -> Result<(), OrderlyError> {
        self.inner
            .send_frame(&SubscribeRequest::subscribe(&self.inner.client_id, topic))
    }

    /// Unsubscribe from a topic and drop its queue (connection required).
    pub fn unsubscribe(&self, topic: &str) -> Result<(), OrderlyError> {
        self.inner
            .send_frame(&SubscribeRequest::unsubscribe(&self.inner.client_id, topic))?;
        self.inner.registry.remove(topic);
        Ok(())
    }

    /// Request an orderbook snapshot for a symbol (connection required).
    ///
    /// The response is delivered to the `{symbol}@orderbook` topic, which is
    /// registered on demand.
    pub fn request_orderbook(&self, symbol: &str) -> Result<(), OrderlyError> {
        self.inner.registry.ensure(&topics::orderbook(symbol));
        self.inner
            .send_frame(&OrderbookRequest::new(&self.inner.client_id, symbol))
    }

    /// Authenticate the live session (private streams only).
    pub(crate) fn send_login(&self) -> Result<(), OrderlyError> {
        let auth = self
            .inner
            .auth
            .as_ref()
            .ok_or(OrderlyError::MissingCredentials)?;
        self.inner.send_frame(&auth.auth_request(&self.inner.client_id))
    }

    /// Receive the next message for a topic.
    ///
    /// Uses the configured [`recv_timeout`](WsConfig::recv_timeout) as the
    /// stall-log interval; see [`recv_with_timeout`](Self::recv_with_timeout).
    pub async fn recv(&self, topic: &str) -> Result<Value, OrderlyError> {
        self.recv_with_timeout(topic, self.inner.config.recv_timeout).await
    }

    /// Receive the next message for a topic, logging every `timeout` spent
    /// waiting.
    ///
    /// The wait never gives up on its own: the timeout only paces an info
    /// log line so silent topics are visible. Errors are returned only when
    /// the topic has no queue or the manager is stopped.
    pub async fn recv_with_timeout(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Value, OrderlyError> {
        let mut shutdown = self.inner.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(OrderlyError::Stopped);
        }

        loop {
            // Re-fetch each round so queue resets and removals are picked up.
            let receiver = self.inner.registry.receiver(topic).ok_or_else(|| {
                OrderlyError::UnknownTopic {
                    topic: topic.to_string(),
                }
            })?;
            let mut queue = receiver.lock().await;

            tokio::select! {
                res = tokio::time::timeout(timeout, queue.recv()) => match res {
                    Ok(Some(message)) => return Ok(message),
                    // Queue was reset; loop around and pick up its replacement.
                    Ok(None) => {}
                    Err(_) => {
                        info!(
                            client_id = %self.inner.client_id,
                            topic,
                            "no message in {} seconds", timeout.as_secs_f64(),
                        );
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Err(OrderlyError::Stopped);
                    }
                }
            }
        }
    }

    /// Whether a session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.inner.outbound.is_connected()
    }

    /// Names of all registered topics.
    pub fn topics(&self) -> Vec<String> {
        self.inner.registry.topic_names()
    }

    /// The client identifier echoed in control messages.
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// The full endpoint URL, account id included.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The connection configuration.
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }
}

impl fmt::Debug for WsTopicManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsTopicManager")
            .field("client_id", &self.inner.client_id)
            .field("url", &self.inner.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_manager() -> WsTopicManager {
        WsTopicManager::new(
            "TEST".to_string(),
            "ws://127.0.0.1:1/".to_string(),
            WsConfig::default(),
            None,
        )
    }

    #[test]
    fn test_send_requires_connection() {
        let manager = test_manager();
        assert!(matches!(
            manager.send_subscribe("bbos"),
            Err(OrderlyError::NotConnected)
        ));
        assert!(matches!(
            manager.request_orderbook("PERP_BTC_USDC"),
            Err(OrderlyError::NotConnected)
        ));
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_subscribe_registers_topic_without_connection() {
        let manager = test_manager();
        manager.subscribe("bbos");
        manager.subscribe("PERP_ETH_USDC@trade");

        let mut topics = manager.topics();
        topics.sort();
        assert_eq!(topics, vec!["PERP_ETH_USDC@trade", "bbos"]);
    }

    #[tokio::test]
    async fn test_recv_unknown_topic_fails_fast() {
        let manager = test_manager();
        let err = manager
            .recv_with_timeout("bbos", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderlyError::UnknownTopic { .. }));
    }

    #[tokio::test]
    async fn test_recv_after_stop_returns_stopped() {
        let manager = test_manager();
        manager.subscribe("bbos");
        manager.stop().await;

        let err = manager.recv("bbos").await.unwrap_err();
        assert!(matches!(err, OrderlyError::Stopped));
    }

    #[test]
    fn test_login_without_credentials_fails() {
        let manager = test_manager();
        assert!(matches!(
            manager.send_login(),
            Err(OrderlyError::MissingCredentials)
        ));
    }
}
