//! The queue item envelope and its kind-specific payloads.
//!
//! Producers enqueue [`QueueItem`]s with a JSON payload whose shape depends
//! on [`Kind`]. The payload stays opaque until a handler decodes it with
//! [`QueueItem::decode_payload`]; a shape mismatch is a producer bug.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pause::Pause;
use crate::types::Identifier;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What a queue item asks the dispatcher to do.
///
/// Unrecognized kind strings are preserved in [`Kind::Other`] so that the
/// dispatcher can reject them by name instead of failing to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Kind {
    Start,
    Edge,
    Sleep,
    EdgeError,
    Pause,
    Debounce,
    ScheduleBatch,
    QueueMigrate,
    Other(String),
}

impl Kind {
    pub fn as_str(&self) -> &str {
        match self {
            Kind::Start => "start",
            Kind::Edge => "edge",
            Kind::Sleep => "sleep",
            Kind::EdgeError => "edge-error",
            Kind::Pause => "pause",
            Kind::Debounce => "debounce",
            Kind::ScheduleBatch => "schedule-batch",
            Kind::QueueMigrate => "queue-migrate",
            Kind::Other(s) => s,
        }
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "start" => Kind::Start,
            "edge" => Kind::Edge,
            "sleep" => Kind::Sleep,
            "edge-error" => Kind::EdgeError,
            "pause" => Kind::Pause,
            "debounce" => Kind::Debounce,
            "schedule-batch" => Kind::ScheduleBatch,
            "queue-migrate" => Kind::QueueMigrate,
            _ => Kind::Other(s),
        }
    }
}

impl From<Kind> for String {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunInfo
// ---------------------------------------------------------------------------

/// Delivery metadata assigned by the queue when an item is dequeued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInfo {
    /// Zero-based delivery attempt.
    pub attempt: u32,
    /// Time between the item becoming available and being delivered.
    pub latency: Duration,
}

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// A unit of scheduled work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Idempotency key for this unit of work.
    #[serde(default)]
    pub job_id: Option<String>,
    pub kind: Kind,
    pub identifier: Identifier,
    #[serde(default)]
    pub attempt: u32,
    /// Overrides the queue's default attempt budget when set.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Attached by the dispatcher at dequeue time; never serialized.
    #[serde(skip)]
    pub run_info: Option<RunInfo>,
}

impl QueueItem {
    pub fn new(kind: Kind, identifier: Identifier, payload: serde_json::Value) -> Self {
        Self {
            job_id: None,
            kind,
            identifier,
            attempt: 0,
            max_attempts: None,
            payload,
            run_info: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Decode the kind-specific payload.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A control-flow edge between two steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub outgoing: String,
    pub incoming: String,
    /// Set when the edge was produced by a generator step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_generator_step: Option<String>,
}

impl Edge {
    /// The edge that starts a run at its trigger.
    pub fn source() -> Self {
        Self {
            outgoing: "$trigger".to_string(),
            incoming: "step".to_string(),
            incoming_generator_step: None,
        }
    }
}

/// Payload of start, edge, sleep, and edge-error items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEdge {
    pub edge: Edge,
}

/// Payload of pause items: the pause whose timeout elapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadPauseTimeout {
    pub pause_id: Uuid,
    pub pause: Pause,
}
