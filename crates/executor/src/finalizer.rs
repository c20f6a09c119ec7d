//! Publishes the events a completed run emitted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ember_core::consts::{EVENT_RECEIVED_NAME, OTEL_PROPAGATION_KEY};
use ember_core::event::{Event, TrackedEvent};
use ember_core::execution::{FinalizeError, Finalizer};
use ember_core::types::Identifier;
use ember_events::{Message, Publisher, TraceCarrier};
use futures::{stream, TryStreamExt};

/// [`Finalizer`] that publishes each event to the event stream.
///
/// Events are published concurrently. The first failure is returned and
/// publishes not yet started are abandoned; publishes already in flight
/// are not rolled back.
pub struct RunFinalizer {
    publisher: Arc<dyn Publisher>,
    topic: String,
    max_concurrency: Option<usize>,
}

impl RunFinalizer {
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            max_concurrency: None,
        }
    }

    /// Bound the number of concurrent publishes per run.
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max;
        self
    }

    async fn publish_event(&self, event: Event) -> Result<(), FinalizeError> {
        let tracked = TrackedEvent::new(event);
        let data = serde_json::to_string(&tracked)?;

        let carrier = TraceCarrier::from_current();
        let mut metadata = HashMap::new();
        metadata.insert(
            OTEL_PROPAGATION_KEY.to_string(),
            serde_json::to_value(&carrier)?,
        );

        let message = Message {
            name: EVENT_RECEIVED_NAME.to_string(),
            data,
            timestamp: tracked.event.time(),
            metadata,
        };

        self.publisher
            .publish(&self.topic, message)
            .await
            .map_err(|e| FinalizeError::Publish(Box::new(e)))
    }
}

#[async_trait]
impl Finalizer for RunFinalizer {
    async fn finalize(&self, id: &Identifier, events: Vec<Event>) -> Result<(), FinalizeError> {
        if events.is_empty() {
            return Ok(());
        }

        let count = events.len();
        stream::iter(events.into_iter().map(Ok::<_, FinalizeError>))
            .try_for_each_concurrent(self.max_concurrency, |event| self.publish_event(event))
            .await?;

        tracing::debug!(
            run_id = %id.run_id,
            count,
            topic = %self.topic,
            "Published run events",
        );
        Ok(())
    }
}
