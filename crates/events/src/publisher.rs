use std::collections::HashMap;

use async_trait::async_trait;
use ember_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// A message on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    /// Serialized payload.
    pub data: String,
    pub timestamp: Timestamp,
    /// Transport metadata, e.g. the trace carrier.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish to {topic} failed: {reason}")]
    Transport { topic: String, reason: String },
}

/// Publishes messages to named topics.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), PublishError>;
}
