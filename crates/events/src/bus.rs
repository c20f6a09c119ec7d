//! In-process publisher backed by a `tokio::sync::broadcast` channel.
//!
//! [`BroadcastPublisher`] stands in for the external event stream in the
//! lightweight deployment. It is designed to be shared via
//! `Arc<BroadcastPublisher>` between the executor and whatever consumes
//! completed-run events.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::EventStreamConfig;
use crate::publisher::{Message, PublishError, Publisher};

/// A message together with the topic it was published to.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub message: Message,
}

/// In-process fan-out publisher.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published message.
///
/// # Usage
///
/// ```rust
/// use ember_events::{BroadcastPublisher, Message, Publisher};
///
/// # async fn demo() {
/// let bus = BroadcastPublisher::default();
/// let mut rx = bus.subscribe();
///
/// let msg = Message {
///     name: "event/event.received".into(),
///     data: "{}".into(),
///     timestamp: chrono::Utc::now(),
///     metadata: Default::default(),
/// };
/// bus.publish("events", msg).await.unwrap();
/// # }
/// ```
pub struct BroadcastPublisher {
    sender: broadcast::Sender<Published>,
}

impl BroadcastPublisher {
    /// Create a publisher with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &EventStreamConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Subscribe to every message published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::from_config(&EventStreamConfig::default())
    }
}

#[async_trait]
impl Publisher for BroadcastPublisher {
    /// Publish to all current subscribers.
    ///
    /// With no active subscribers the message is dropped.
    async fn publish(&self, topic: &str, message: Message) -> Result<(), PublishError> {
        let published = Published {
            topic: topic.to_string(),
            message,
        };
        // A SendError only means there are zero receivers.
        if self.sender.send(published).is_err() {
            tracing::debug!(topic, "No subscribers, message dropped");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn message(name: &str) -> Message {
        Message {
            name: name.to_string(),
            data: "{}".to_string(),
            timestamp: chrono::Utc::now(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = BroadcastPublisher::default();
        let mut rx = bus.subscribe();

        bus.publish("events", message("test.created")).await.unwrap();

        let received = rx.recv().await.expect("should receive the message");
        assert_eq!(received.topic, "events");
        assert_eq!(received.message.name, "test.created");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_message() {
        let bus = BroadcastPublisher::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish("events", message("multi.test")).await.unwrap();

        let m1 = rx1.recv().await.expect("subscriber 1 should receive");
        let m2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(m1.message.name, "multi.test");
        assert_eq!(m2.message.name, "multi.test");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_succeeds() {
        let bus = BroadcastPublisher::default();
        assert!(bus.publish("events", message("orphan")).await.is_ok());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        // broadcast::channel panics on zero capacity.
        let _bus = BroadcastPublisher::new(0);
    }
}
