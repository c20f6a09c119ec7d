//! Batch subsystem contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status observed when atomically starting a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// The batch expired or was never populated.
    Absent,
    /// Another dispatcher already started this batch.
    Started,
    /// This call transitioned the batch; the caller must start the run.
    Ready,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchStatus::Absent => "absent",
            BatchStatus::Started => "started",
            BatchStatus::Ready => "ready",
        })
    }
}

/// Payload of schedule-batch queue items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBatchOpts {
    pub batch_id: Uuid,
    pub function_id: Uuid,
    /// Opaque cursor into the accumulated batch items.
    pub batch_pointer: String,
}

/// Everything the engine needs to turn a ready batch into a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBatchPayload {
    pub batch_id: Uuid,
    pub batch_pointer: String,
    pub account_id: Uuid,
    pub workspace_id: Uuid,
    pub app_id: Uuid,
    pub function_id: Uuid,
    pub function_version: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch storage error: {0}")]
    Storage(String),
}

/// Owner of batch descriptors.
#[async_trait]
pub trait BatchManager: Send + Sync {
    /// Atomically mark the batch as started, returning the status observed
    /// before the transition.
    async fn start_execution(
        &self,
        function_id: Uuid,
        batch_id: Uuid,
        batch_pointer: &str,
    ) -> Result<BatchStatus, BatchError>;

    /// Remove all state held for the batch.
    async fn delete_keys(&self, function_id: Uuid, batch_id: Uuid) -> Result<(), BatchError>;
}
