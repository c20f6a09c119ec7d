//! Step execution: start, edge, sleep, and edge-error items.

use ember_core::error::{ExecuteFailure, ExecutionError};
use ember_core::queue::{PayloadEdge, QueueItem};

use crate::dispatcher::Dispatcher;
use crate::error::ExecutorError;

/// How the queue should proceed after a step ran.
#[derive(Debug)]
pub enum StepOutcome {
    /// Nothing further to do for this item.
    Stop,
    /// Re-deliver the item later.
    Retry(ExecutorError),
    /// The step yielded more work; pick it up immediately.
    ContinueNow,
}

impl Dispatcher {
    /// Execute the step an item points at and classify the result.
    ///
    /// Only an undecodable payload is returned as `Err`; every engine
    /// outcome is folded into a [`StepOutcome`].
    pub async fn handle_step(&self, item: &QueueItem) -> Result<StepOutcome, ExecutorError> {
        let payload: PayloadEdge = item
            .decode_payload()
            .map_err(|source| ExecutorError::MalformedPayload { kind: "edge", source })?;

        let result = self
            .executor
            .execute(&item.identifier, item, &payload.edge)
            .await;

        let (response, error) = match result {
            Ok(response) => (response, None),
            Err(ExecuteFailure { error, response }) => (response, Some(error)),
        };

        match error {
            // Cancelled runs must not schedule children of this step.
            Some(ExecutionError::FunctionCancelled) => return Ok(StepOutcome::Stop),
            Some(ExecutionError::FunctionPaused) => {
                return Ok(StepOutcome::Retry(ExecutorError::Paused(
                    ExecutionError::FunctionPaused,
                )))
            }
            // Downstream steps still need their chance to be scheduled.
            Some(ExecutionError::HandledStepError) => {
                return Ok(StepOutcome::Retry(ExecutionError::HandledStepError.into()))
            }
            _ => {}
        }

        // The driver's own verdict on retryability takes priority over the
        // generic call error.
        let outcome = match (error, response) {
            (Some(_), Some(resp)) if !resp.retryable() => StepOutcome::Stop,
            (Some(err), _) => StepOutcome::Retry(ExecutorError::Engine(err)),
            (None, Some(resp)) if resp.err.is_some() => {
                if resp.retryable() {
                    StepOutcome::Retry(ExecutorError::StepFailed(resp.error().to_string()))
                } else {
                    StepOutcome::Stop
                }
            }
            (None, Some(resp)) if !resp.generator.is_empty() => StepOutcome::ContinueNow,
            (None, _) => StepOutcome::Stop,
        };

        Ok(outcome)
    }
}
