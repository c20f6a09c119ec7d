use ember_core::consts::OTEL_SCOPE_DEBOUNCE;
use ember_core::debounce::{DebounceError, DebouncePayload};
use ember_core::execution::ScheduleRequest;
use ember_core::queue::QueueItem;
use tracing::Instrument;

use crate::dispatcher::Dispatcher;
use crate::error::ExecutorError;

impl Dispatcher {
    /// Promote an expired debounce into a run.
    ///
    /// A record that is already gone or that a concurrent extension moved is
    /// not an error: somebody else owns it now.
    pub async fn handle_debounce(&self, item: &QueueItem) -> Result<(), ExecutorError> {
        let payload: DebouncePayload = item
            .decode_payload()
            .map_err(|source| ExecutorError::MalformedPayload {
                kind: "debounce",
                source,
            })?;

        let function = self.find_function(payload.function_id).await?;

        let debounced = match self
            .debouncer
            .get_debounce_item(payload.debounce_id, payload.account_id)
            .await
        {
            Ok(debounced) => debounced,
            Err(DebounceError::NotFound) => {
                tracing::info!(
                    debounce_id = %payload.debounce_id,
                    fn_id = %payload.function_id,
                    "Debounce not found",
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match self
            .debouncer
            .start_execution(&debounced, &function, payload.debounce_id)
            .await
        {
            Ok(()) => {}
            Err(DebounceError::Migrating) => {
                tracing::warn!(
                    debounce_id = %payload.debounce_id,
                    fn_id = %payload.function_id,
                    "Debounce is migrating, skipping",
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let span = tracing::info_span!(
            "debounce",
            otel.scope = OTEL_SCOPE_DEBOUNCE,
            sys.account_id = %item.identifier.account_id,
            sys.workspace_id = %item.identifier.workspace_id,
            sys.app_id = %item.identifier.app_id,
            sys.function_id = %item.identifier.workflow_id,
            sys.debounce.timeout = true,
            sys.step.delete = tracing::field::Empty,
            sdk.run.id = tracing::field::Empty,
        );

        let request = ScheduleRequest {
            function,
            account_id: debounced.account_id,
            workspace_id: debounced.workspace_id,
            app_id: debounced.app_id,
            events: vec![debounced.tracked_event()],
            prevent_debounce: true,
            function_paused_at: debounced.function_paused_at,
            idempotency_key: None,
        };

        let metadata = match self
            .executor
            .schedule(request)
            .instrument(span.clone())
            .await
        {
            Ok(metadata) => metadata,
            Err(err) => {
                span.record("sys.step.delete", true);
                return Err(err.into());
            }
        };

        if let Some(metadata) = &metadata {
            span.record("sdk.run.id", tracing::field::display(metadata.id.run_id));
        }

        // The run exists; a stale record only costs storage.
        if let Err(e) = self
            .debouncer
            .delete_debounce_item(payload.debounce_id, &debounced, payload.account_id)
            .await
        {
            tracing::debug!(
                debounce_id = %payload.debounce_id,
                error = %e,
                "Failed to delete debounce record",
            );
        }

        Ok(())
    }
}
