//! The dispatch loop's per-item entry point.
//!
//! [`Dispatcher`] is registered with the queue as its [`QueueHandler`]. For
//! every delivered item it attaches the delivery metadata, holds an
//! in-flight token for the duration of the call so that shutdown can drain,
//! routes the item by kind, and turns the handler's outcome into a queue
//! instruction. Errors are logged here, once, with the run identity.

use std::sync::Arc;

use async_trait::async_trait;
use ember_core::batch::BatchManager;
use ember_core::catalog::FunctionCatalog;
use ember_core::debounce::Debouncer;
use ember_core::execution::Executor;
use ember_core::function::Function;
use ember_core::queue::{Kind, QueueItem, RunInfo};
use ember_queue::{HandlerError, QueueHandler, RunResult};
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::handlers::StepOutcome;

/// Routes queue items to their handlers.
pub struct Dispatcher {
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) catalog: Arc<dyn FunctionCatalog>,
    pub(crate) debouncer: Arc<dyn Debouncer>,
    pub(crate) batcher: Arc<dyn BatchManager>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn Executor>,
        catalog: Arc<dyn FunctionCatalog>,
        debouncer: Arc<dyn Debouncer>,
        batcher: Arc<dyn BatchManager>,
    ) -> Self {
        Self {
            executor,
            catalog,
            debouncer,
            batcher,
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker holding one token per in-flight invocation.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Number of invocations currently being handled.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Route `item` to its handler.
    ///
    /// Returns whether an immediate continuation was scheduled.
    pub async fn dispatch(&self, item: &QueueItem) -> Result<bool, ExecutorError> {
        match &item.kind {
            Kind::Start | Kind::Edge | Kind::Sleep | Kind::EdgeError => {
                match self.handle_step(item).await? {
                    StepOutcome::Stop => Ok(false),
                    StepOutcome::ContinueNow => Ok(true),
                    StepOutcome::Retry(err) => Err(err),
                }
            }
            Kind::Pause => self.handle_pause_timeout(item).await.map(|()| false),
            Kind::Debounce => self.handle_debounce(item).await.map(|()| false),
            Kind::ScheduleBatch => self.handle_scheduled_batch(item).await.map(|()| false),
            Kind::QueueMigrate => {
                // Migration between queue shards does not exist in the
                // lightweight deployment.
                tracing::debug!(
                    run_id = %item.identifier.run_id,
                    "Ignoring queue migration item",
                );
                Ok(false)
            }
            Kind::Other(kind) => Err(ExecutorError::UnknownPayloadKind(kind.clone())),
        }
    }

    /// Find a function definition by id.
    pub(crate) async fn find_function(&self, id: Uuid) -> Result<Function, ExecutorError> {
        self.catalog
            .function(id)
            .await?
            .ok_or(ExecutorError::FunctionNotFound(id))
    }
}

#[async_trait]
impl QueueHandler for Dispatcher {
    async fn handle(&self, info: RunInfo, mut item: QueueItem) -> Result<RunResult, HandlerError> {
        let _in_flight = self.tracker.token();
        item.run_info = Some(info);

        // Engine calls, and any run finalized by them, share this trace.
        let span = tracing::info_span!(
            "queue_item",
            run_id = %item.identifier.run_id,
            fn_id = %item.identifier.workflow_id,
            kind = %item.kind,
        );

        match self.dispatch(&item).instrument(span).await {
            Ok(continuation) => Ok(RunResult {
                scheduled_immediate_job: continuation,
            }),
            Err(err) => {
                if !err.is_silent() {
                    tracing::error!(
                        run_id = %item.identifier.run_id,
                        fn_id = %item.identifier.workflow_id,
                        account_id = %item.identifier.account_id,
                        kind = %item.kind,
                        job_id = item.job_id.as_deref().unwrap_or_default(),
                        error = %err,
                        "Error handling queue item",
                    );
                }
                Err(err.into())
            }
        }
    }
}
