//! Per-topic message queues.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::OrderlyError;

/// Shared consumer handle for a topic queue.
pub(crate) type TopicReceiver = Arc<tokio::sync::Mutex<UnboundedReceiver<Value>>>;

struct TopicChannel {
    tx: UnboundedSender<Value>,
    rx: TopicReceiver,
}

impl TopicChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

/// Registry of per-topic message queues.
///
/// The registry outlives individual connections: sessions come and go, the
/// queues stay, and the set of registered topics doubles as the subscription
/// list replayed on every reconnect. Publishing is strict: frames for topics
/// nobody registered are rejected rather than silently buffered.
#[derive(Default)]
pub(crate) struct TopicRegistry {
    topics: Mutex<HashMap<String, TopicChannel>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TopicChannel>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a topic with a fresh queue, dropping any unread backlog.
    pub fn subscribe(&self, topic: &str) {
        self.lock().insert(topic.to_string(), TopicChannel::new());
    }

    /// Register a topic only if it has no queue yet, keeping any backlog.
    pub fn ensure(&self, topic: &str) {
        self.lock()
            .entry(topic.to_string())
            .or_insert_with(TopicChannel::new);
    }

    /// Drop a topic's queue. Returns whether the topic was registered.
    pub fn remove(&self, topic: &str) -> bool {
        self.lock().remove(topic).is_some()
    }

    /// Consumer handle for a topic, if registered.
    pub fn receiver(&self, topic: &str) -> Option<TopicReceiver> {
        self.lock().get(topic).map(|channel| Arc::clone(&channel.rx))
    }

    /// Append a payload to a topic's queue.
    pub fn publish(&self, topic: &str, payload: Value) -> Result<(), OrderlyError> {
        let topics = self.lock();
        let channel = topics.get(topic).ok_or_else(|| OrderlyError::UnknownTopic {
            topic: topic.to_string(),
        })?;
        channel.tx.send(payload).map_err(|_| OrderlyError::UnknownTopic {
            topic: topic.to_string(),
        })
    }

    /// Names of all registered topics.
    pub fn topic_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
