use ember_core::execution::ResumeRequest;
use ember_core::queue::{PayloadPauseTimeout, QueueItem};

use crate::dispatcher::Dispatcher;
use crate::error::ExecutorError;

impl Dispatcher {
    /// Resume a run whose pause expired.
    ///
    /// Invoke pauses resume with a typed timeout failure so the waiting step
    /// sees why it woke up. Engine errors are returned unchanged.
    pub async fn handle_pause_timeout(&self, item: &QueueItem) -> Result<(), ExecutorError> {
        let payload: PayloadPauseTimeout = item
            .decode_payload()
            .map_err(|source| ExecutorError::MalformedPayload {
                kind: "pause timeout",
                source,
            })?;
        let job_id = item.job_id.as_deref().ok_or(ExecutorError::MissingJobId)?;

        let mut request = ResumeRequest::timeout(job_id);
        if payload.pause.is_invoke() {
            request.set_invoke_timeout_error();
        }

        tracing::debug!(
            run_id = %item.identifier.run_id,
            pause_id = %payload.pause_id,
            "Resuming timed out step",
        );

        self.executor
            .resume_pause_timeout(&payload.pause, request)
            .await?;
        Ok(())
    }
}
