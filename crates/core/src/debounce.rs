//! Debounce subsystem contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Event, TrackedEvent};
use crate::function::Function;
use crate::types::Timestamp;

/// Payload of debounce queue items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebouncePayload {
    pub debounce_id: Uuid,
    pub account_id: Uuid,
    pub function_id: Uuid,
    #[serde(default)]
    pub function_version: i32,
}

/// A pending debounced invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebounceItem {
    pub account_id: Uuid,
    pub workspace_id: Uuid,
    pub app_id: Uuid,
    pub function_id: Uuid,
    #[serde(default)]
    pub function_version: i32,
    /// Internal id of the most recent triggering event.
    pub event_id: Uuid,
    /// The most recent triggering event; it replaces earlier ones.
    pub event: Event,
    /// When set, the function was paused while the debounce was pending.
    #[serde(default)]
    pub function_paused_at: Option<Timestamp>,
}

impl DebounceItem {
    /// The debounced event as the trigger of a new run.
    pub fn tracked_event(&self) -> TrackedEvent {
        TrackedEvent {
            internal_id: self.event_id,
            workspace_id: Some(self.workspace_id),
            event: self.event.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DebounceError {
    /// The record is gone, e.g. already promoted or moved to another cluster.
    #[error("debounce not found")]
    NotFound,

    /// A concurrent debounce extension moved the record.
    #[error("debounce is migrating")]
    Migrating,

    #[error("debounce storage error: {0}")]
    Storage(String),
}

/// Owner of debounce records.
#[async_trait]
pub trait Debouncer: Send + Sync {
    async fn get_debounce_item(
        &self,
        debounce_id: Uuid,
        account_id: Uuid,
    ) -> Result<DebounceItem, DebounceError>;

    /// Promote the record into a run, claiming it against concurrent
    /// extensions.
    async fn start_execution(
        &self,
        item: &DebounceItem,
        function: &Function,
        debounce_id: Uuid,
    ) -> Result<(), DebounceError>;

    async fn delete_debounce_item(
        &self,
        debounce_id: Uuid,
        item: &DebounceItem,
        account_id: Uuid,
    ) -> Result<(), DebounceError>;
}
