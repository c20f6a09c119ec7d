//! The execution engine contract.
//!
//! The dispatcher never interprets step code itself. It hands each step to
//! an [`Executor`] and classifies what comes back: the [`DriverResponse`]
//! and the typed [`ExecutionError`](crate::error::ExecutionError).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::batch::ScheduleBatchPayload;
use crate::consts::{INVOKE_TIMEOUT_ERROR_MESSAGE, INVOKE_TIMEOUT_ERROR_NAME};
use crate::error::{BoxError, ExecuteFailure, ExecutionError};
use crate::event::{Event, TrackedEvent};
use crate::function::Function;
use crate::pause::Pause;
use crate::queue::{Edge, QueueItem};
use crate::types::{Identifier, Timestamp};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// An operation a step can yield back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    None,
    Step,
    StepRun,
    StepError,
    StepPlanned,
    Sleep,
    WaitForEvent,
    InvokeFunction,
}

/// An instruction a step yielded mid-execution describing further work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOpcode {
    pub op: Opcode,
    /// Hashed step id.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// DriverResponse
// ---------------------------------------------------------------------------

/// What the driver reported after running a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverResponse {
    /// Step id the response belongs to.
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub output: serde_json::Value,
    /// Error text reported by the SDK, if the step failed.
    #[serde(default)]
    pub err: Option<String>,
    /// Set by the SDK when the failure must not be retried.
    #[serde(default)]
    pub no_retry: bool,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub generator: Vec<GeneratorOpcode>,
}

impl DriverResponse {
    /// Whether a failed step may be retried.
    ///
    /// Client errors other than timeouts and rate limits are terminal.
    pub fn retryable(&self) -> bool {
        if self.no_retry {
            return false;
        }
        match self.status_code {
            Some(code) => !(400..500).contains(&code) || code == 408 || code == 429,
            None => true,
        }
    }

    /// The reported error text, or an empty string.
    pub fn error(&self) -> &str {
        self.err.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A typed failure injected into a resumed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeError {
    pub name: String,
    pub message: String,
}

/// How a paused run should be resumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeRequest {
    #[serde(default)]
    pub with: Option<serde_json::Value>,
    pub is_timeout: bool,
    /// Deduplicates repeated resumes of the same pause.
    pub idempotency_key: String,
    #[serde(default)]
    pub error: Option<ResumeError>,
}

impl ResumeRequest {
    /// A resume caused by the pause's timeout elapsing.
    pub fn timeout(idempotency_key: impl Into<String>) -> Self {
        Self {
            with: None,
            is_timeout: true,
            idempotency_key: idempotency_key.into(),
            error: None,
        }
    }

    /// Make the waiting step observe a typed invoke timeout instead of a
    /// silent resumption.
    pub fn set_invoke_timeout_error(&mut self) {
        self.error = Some(ResumeError {
            name: INVOKE_TIMEOUT_ERROR_NAME.to_string(),
            message: INVOKE_TIMEOUT_ERROR_MESSAGE.to_string(),
        });
    }
}

/// A request to start a new run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub function: Function,
    pub account_id: uuid::Uuid,
    pub workspace_id: uuid::Uuid,
    pub app_id: uuid::Uuid,
    pub events: Vec<TrackedEvent>,
    /// Schedule the run directly instead of debouncing it again.
    pub prevent_debounce: bool,
    pub function_paused_at: Option<Timestamp>,
    pub idempotency_key: Option<String>,
}

/// Metadata of a newly scheduled run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub id: Identifier,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A finalizer failed to emit one of a run's completion events.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("error marshalling event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("error publishing event: {0}")]
    Publish(#[source] BoxError),
}

/// Callback invoked once a run reaches a terminal state.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, id: &Identifier, events: Vec<Event>) -> Result<(), FinalizeError>;
}

/// The step-execution engine.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the step reached through `edge`.
    ///
    /// `Ok(None)` means the engine had nothing to run (e.g. the step was
    /// already memoized).
    async fn execute(
        &self,
        id: &Identifier,
        item: &QueueItem,
        edge: &Edge,
    ) -> Result<Option<DriverResponse>, ExecuteFailure>;

    async fn resume_pause_timeout(
        &self,
        pause: &Pause,
        request: ResumeRequest,
    ) -> Result<(), ExecutionError>;

    async fn schedule(&self, request: ScheduleRequest) -> Result<Option<RunMetadata>, ExecutionError>;

    async fn retrieve_and_schedule_batch(
        &self,
        function: &Function,
        payload: ScheduleBatchPayload,
    ) -> Result<(), ExecutionError>;

    /// Register the completion callback. Called once, before the queue runs.
    fn set_finalizer(&self, finalizer: Arc<dyn Finalizer>);

    /// Stop delivering lifecycle notifications.
    async fn close_lifecycle_listeners(&self);
}
