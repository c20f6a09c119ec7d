use ember_core::batch::{BatchStatus, ScheduleBatchOpts, ScheduleBatchPayload};
use ember_core::queue::QueueItem;

use crate::dispatcher::Dispatcher;
use crate::error::ExecutorError;

impl Dispatcher {
    /// Start the run for a batch whose collection window closed.
    ///
    /// The batch subsystem's `start_execution` is the only guard against
    /// two dispatchers starting the same batch: whoever observes
    /// [`BatchStatus::Ready`] owns the start.
    pub async fn handle_scheduled_batch(&self, item: &QueueItem) -> Result<(), ExecutorError> {
        let opts: ScheduleBatchOpts = item
            .decode_payload()
            .map_err(|source| ExecutorError::MalformedPayload {
                kind: "schedule batch",
                source,
            })?;

        let status = self
            .batcher
            .start_execution(opts.function_id, opts.batch_id, &opts.batch_pointer)
            .await?;

        match status {
            BatchStatus::Started => {
                tracing::debug!(batch_id = %opts.batch_id, "Batch already started");
                return Ok(());
            }
            BatchStatus::Absent => {
                // Cleanup is advisory.
                if let Err(e) = self.batcher.delete_keys(opts.function_id, opts.batch_id).await {
                    tracing::debug!(
                        batch_id = %opts.batch_id,
                        error = %e,
                        "Failed to clean up absent batch",
                    );
                }
                return Ok(());
            }
            BatchStatus::Ready => {}
        }

        let function = self.find_function(opts.function_id).await?;

        let payload = ScheduleBatchPayload {
            batch_id: opts.batch_id,
            batch_pointer: opts.batch_pointer,
            account_id: item.identifier.account_id,
            workspace_id: item.identifier.workspace_id,
            app_id: item.identifier.app_id,
            function_id: item.identifier.workflow_id,
            function_version: function.function_version,
        };

        self.executor
            .retrieve_and_schedule_batch(&function, payload)
            .await
            .map_err(ExecutorError::BatchRetrieval)?;

        tracing::info!(
            batch_id = %opts.batch_id,
            fn_id = %opts.function_id,
            "Scheduled batch run",
        );
        Ok(())
    }
}
