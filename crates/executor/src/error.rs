use ember_core::batch::BatchError;
use ember_core::catalog::CatalogError;
use ember_core::config::ConfigError;
use ember_core::debounce::DebounceError;
use ember_core::error::ExecutionError;
use ember_queue::{HandlerError, QueueError, RetryPolicy};
use uuid::Uuid;

/// Errors produced while dispatching queue items or running the service.
///
/// The variant a handler returns decides how the queue treats the item;
/// see [`ExecutorError::retry_policy`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The payload did not match the shape its kind requires.
    #[error("unable to decode {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown payload kind: {0}")]
    UnknownPayloadKind(String),

    #[error("queue item has no job id")]
    MissingJobId,

    #[error("no function found with ID: {0}")]
    FunctionNotFound(Uuid),

    /// The run is paused and must wait the pause out.
    #[error(transparent)]
    Paused(ExecutionError),

    /// The driver reported a retryable step failure.
    #[error("{0}")]
    StepFailed(String),

    #[error(transparent)]
    Engine(#[from] ExecutionError),

    #[error("could not retrieve and schedule batch items: {0}")]
    BatchRetrieval(#[source] ExecutionError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Debounce(#[from] DebounceError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no {0} provided")]
    MissingCollaborator(&'static str),

    #[error("timed out draining {remaining} in-flight queue items")]
    DrainTimeout { remaining: usize },
}

impl ExecutorError {
    /// How the queue must treat an item that failed with this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ExecutorError::Paused(_) => RetryPolicy::Always,
            ExecutorError::MalformedPayload { .. }
            | ExecutorError::UnknownPayloadKind(_)
            | ExecutorError::MissingJobId
            | ExecutorError::FunctionNotFound(_)
            | ExecutorError::Engine(ExecutionError::NonRetriable(_)) => RetryPolicy::Never,
            _ => RetryPolicy::Default,
        }
    }

    /// Errors the engine already reported as non-retriable; they are not
    /// logged again by the dispatch loop.
    pub fn is_silent(&self) -> bool {
        matches!(self, ExecutorError::Engine(ExecutionError::NonRetriable(_)))
    }
}

impl From<ExecutorError> for HandlerError {
    fn from(err: ExecutorError) -> Self {
        HandlerError::new(err.retry_policy(), err)
    }
}
