use crate::execution::DriverResponse;

/// Boxed error used where a collaborator's concrete error type is opaque.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by the execution engine.
///
/// The first four variants are sentinels: the dispatcher classifies a step
/// by which of them it receives, never by message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The run was cancelled; no further steps may be scheduled.
    #[error("function cancelled")]
    FunctionCancelled,

    /// The function is paused; the item must wait rather than fail.
    #[error("function paused")]
    FunctionPaused,

    /// The step failed, but the engine already recorded the failure and
    /// scheduled whatever handles it.
    #[error("handled step error")]
    HandledStepError,

    /// The engine has decided this item must never be retried.
    #[error("non-retriable error: {0}")]
    NonRetriable(String),

    /// The run's state could not be found.
    #[error("run not found")]
    RunNotFound,

    /// Any other engine failure.
    #[error("{0}")]
    Internal(String),
}

/// A failed `execute` call.
///
/// The engine may return a driver response alongside the error; the
/// response's own retry verdict takes priority over the generic error when
/// classifying the step.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ExecuteFailure {
    #[source]
    pub error: ExecutionError,
    pub response: Option<DriverResponse>,
}

impl ExecuteFailure {
    pub fn with_response(error: ExecutionError, response: DriverResponse) -> Self {
        Self {
            error,
            response: Some(response),
        }
    }
}

impl From<ExecutionError> for ExecuteFailure {
    fn from(error: ExecutionError) -> Self {
        Self {
            error,
            response: None,
        }
    }
}
