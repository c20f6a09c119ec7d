//! The executor service: wires the dispatcher to a queue and manages its
//! lifecycle.
//!
//! Lifecycle:
//! 1. [`ExecutorService::pre`] registers the run finalizer with the engine.
//! 2. [`ExecutorService::run`] subscribes the dispatcher to the queue and
//!    blocks until the cancellation token fires.
//! 3. [`ExecutorService::stop`] closes lifecycle listeners, then waits for
//!    every in-flight invocation to finish.

use std::sync::Arc;

use ember_core::batch::BatchManager;
use ember_core::catalog::FunctionCatalog;
use ember_core::debounce::Debouncer;
use ember_core::execution::Executor;
use ember_events::Publisher;
use ember_queue::Queue;
use tokio_util::sync::CancellationToken;

use crate::config::ExecutorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ExecutorError;
use crate::finalizer::RunFinalizer;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the service's collaborators. Every one is required.
#[derive(Default)]
pub struct ExecutorServiceBuilder {
    config: ExecutorConfig,
    queue: Option<Arc<dyn Queue>>,
    executor: Option<Arc<dyn Executor>>,
    catalog: Option<Arc<dyn FunctionCatalog>>,
    debouncer: Option<Arc<dyn Debouncer>>,
    batcher: Option<Arc<dyn BatchManager>>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl ExecutorServiceBuilder {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn FunctionCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_debouncer(mut self, debouncer: Arc<dyn Debouncer>) -> Self {
        self.debouncer = Some(debouncer);
        self
    }

    pub fn with_batcher(mut self, batcher: Arc<dyn BatchManager>) -> Self {
        self.batcher = Some(batcher);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> Result<ExecutorService, ExecutorError> {
        let queue = self.queue.ok_or(ExecutorError::MissingCollaborator("queue"))?;
        let executor = self
            .executor
            .ok_or(ExecutorError::MissingCollaborator("executor"))?;
        let catalog = self
            .catalog
            .ok_or(ExecutorError::MissingCollaborator("function catalog"))?;
        let debouncer = self
            .debouncer
            .ok_or(ExecutorError::MissingCollaborator("debouncer"))?;
        let batcher = self
            .batcher
            .ok_or(ExecutorError::MissingCollaborator("batch manager"))?;
        let publisher = self
            .publisher
            .ok_or(ExecutorError::MissingCollaborator("publisher"))?;

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&executor),
            catalog,
            debouncer,
            batcher,
        ));

        Ok(ExecutorService {
            config: self.config,
            queue,
            executor,
            publisher,
            dispatcher,
        })
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ExecutorService {
    config: ExecutorConfig,
    queue: Arc<dyn Queue>,
    executor: Arc<dyn Executor>,
    publisher: Arc<dyn Publisher>,
    dispatcher: Arc<Dispatcher>,
}

impl ExecutorService {
    pub fn builder(config: ExecutorConfig) -> ExecutorServiceBuilder {
        ExecutorServiceBuilder::new(config)
    }

    pub fn name(&self) -> &'static str {
        "executor"
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Register the run finalizer with the engine.
    pub async fn pre(&self) -> Result<(), ExecutorError> {
        let finalizer = RunFinalizer::new(
            Arc::clone(&self.publisher),
            self.config.event_stream.topic.clone(),
        )
        .with_max_concurrency(self.config.finalizer_max_concurrency);

        self.executor.set_finalizer(Arc::new(finalizer));
        Ok(())
    }

    /// Deliver queue items to the dispatcher until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ExecutorError> {
        tracing::info!(service = self.name(), "Subscribing to function queue");
        let handler = Arc::clone(&self.dispatcher);
        self.queue.run(handler, cancel).await?;
        Ok(())
    }

    /// Drain in-flight invocations.
    ///
    /// Call after `run` returned. With a configured drain timeout, gives up
    /// once it elapses and reports how many invocations were still running.
    pub async fn stop(&self) -> Result<(), ExecutorError> {
        self.executor.close_lifecycle_listeners().await;

        let tracker = self.dispatcher.tracker();
        tracker.close();

        match self.config.drain_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, tracker.wait()).await.is_err() {
                    let remaining = tracker.len();
                    tracing::warn!(
                        service = self.name(),
                        remaining,
                        "Drain timed out with queue items still in flight",
                    );
                    return Err(ExecutorError::DrainTimeout { remaining });
                }
            }
            None => tracker.wait().await,
        }

        tracing::info!(service = self.name(), "Executor stopped");
        Ok(())
    }
}
