use std::sync::Arc;

use async_trait::async_trait;
use ember_core::queue::{QueueItem, RunInfo};
use tokio_util::sync::CancellationToken;

use crate::error::{HandlerError, QueueError};

/// Successful outcome of handling one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    /// The handler produced further work for the same run that should be
    /// picked up without delay.
    pub scheduled_immediate_job: bool,
}

/// Callback invoked once per delivered item.
///
/// Deliveries are at-least-once and may run concurrently, including for the
/// same run.
#[async_trait]
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, info: RunInfo, item: QueueItem) -> Result<RunResult, HandlerError>;
}

/// A queue that pushes items to a handler.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Deliver items to `handler` until `cancel` is triggered.
    async fn run(
        &self,
        handler: Arc<dyn QueueHandler>,
        cancel: CancellationToken,
    ) -> Result<(), QueueError>;
}
