use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{ServerFrame, Topic, UserId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Subscriber {
    topic: Topic,
    user_id: UserId,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

struct BroadcasterInner {
    subscribers: DashMap<ConnectionId, Subscriber>,
    next_connection_id: AtomicU64,
}

/// In-memory topic pub/sub. Each subscription gets its own unbounded
/// channel; delivery is fire-and-forget and ordered per subscription.
#[derive(Clone)]
pub struct TopicBroadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Default for TopicBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                subscribers: DashMap::new(),
                next_connection_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(
        &self,
        topic: Topic,
        user_id: UserId,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerFrame>) {
        let id = ConnectionId(self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.insert(id, Subscriber { topic, user_id, tx });
        debug!("User {} subscribed to {} as {}", user_id, topic, id);
        (id, rx)
    }

    /// Drops the subscription; its receiver sees the channel close.
    pub fn unsubscribe(&self, connection: ConnectionId) -> bool {
        let removed = self.inner.subscribers.remove(&connection).is_some();
        if removed {
            debug!("{} unsubscribed", connection);
        }
        removed
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner
            .subscribers
            .iter()
            .filter(|s| s.topic == *topic)
            .count()
    }

    pub fn broadcast(
        &self,
        topic: &Topic,
        event: &str,
        data: Value,
        exclude: Option<UserId>,
    ) -> usize {
        let topic_name = topic.to_string();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.inner.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.topic != *topic || Some(subscriber.user_id) == exclude {
                continue;
            }
            let frame = ServerFrame::new(event, topic_name.as_str(), data.clone());
            match subscriber.tx.send(frame) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(*entry.key()),
            }
        }

        for id in closed {
            warn!("Dropping closed subscription {} on {}", id, topic_name);
            self.inner.subscribers.remove(&id);
        }

        if delivered == 0 {
            debug!("No subscribers reached for '{}' on {}", event, topic_name);
        }
        delivered
    }
}

#[async_trait]
impl SignalingOutput for TopicBroadcaster {
    async fn publish(
        &self,
        topic: &Topic,
        event: &str,
        data: Value,
        exclude: Option<UserId>,
    ) -> usize {
        self.broadcast(topic, event, data, exclude)
    }
}
