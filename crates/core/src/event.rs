//! Events emitted by runs and the tracking envelope they are published in.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// A user-facing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dot- or slash-separated event name, e.g. `"app/user.created"`.
    pub name: String,

    /// Free-form JSON payload.
    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,

    /// Producer-supplied id used for deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Milliseconds since the Unix epoch; `0` means "now".
    #[serde(rename = "ts", default)]
    pub timestamp: i64,

    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
            user: None,
            id: None,
            timestamp: Utc::now().timestamp_millis(),
            version: None,
        }
    }

    /// The event's timestamp, or the current time when it carries none.
    pub fn time(&self) -> Timestamp {
        if self.timestamp == 0 {
            return Utc::now();
        }
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// An event together with the internal id assigned when it entered the
/// system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub internal_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
    pub event: Event,
}

impl TrackedEvent {
    /// Wrap `event` with a freshly minted, time-ordered internal id.
    pub fn new(event: Event) -> Self {
        Self {
            internal_id: Uuid::now_v7(),
            workspace_id: None,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_uses_event_timestamp() {
        let mut event = Event::new("app/test", serde_json::json!({}));
        event.timestamp = 1_700_000_000_000;
        assert_eq!(event.time().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn zero_timestamp_means_now() {
        let mut event = Event::new("app/test", serde_json::json!({}));
        event.timestamp = 0;
        let before = Utc::now();
        assert!(event.time() >= before);
    }

    #[test]
    fn tracked_events_get_distinct_ids() {
        let event = Event::new("app/test", serde_json::json!({"a": 1}));
        let a = TrackedEvent::new(event.clone());
        let b = TrackedEvent::new(event);
        assert_ne!(a.internal_id, b.internal_id);
    }

    #[test]
    fn serializes_short_field_names() {
        let mut event = Event::new("app/test", serde_json::json!({"a": 1}));
        event.timestamp = 5;
        let value = serde_json::to_value(TrackedEvent::new(event)).unwrap();
        assert_eq!(value["event"]["ts"], 5);
        assert_eq!(value["event"]["name"], "app/test");
        assert!(value["event"].get("user").is_none());
    }
}
