//! Shared fakes and fixtures for the executor integration tests.
//!
//! Every collaborator is an in-memory fake that records how it was called,
//! so tests assert on both the handler's result and its side effects.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ember_core::batch::{BatchError, BatchManager, BatchStatus, ScheduleBatchPayload};
use ember_core::catalog::InMemoryCatalog;
use ember_core::debounce::{DebounceError, DebounceItem, Debouncer};
use ember_core::error::{ExecuteFailure, ExecutionError};
use ember_core::event::Event;
use ember_core::execution::{
    DriverResponse, Executor, Finalizer, ResumeRequest, RunMetadata, ScheduleRequest,
};
use ember_core::function::Function;
use ember_core::pause::Pause;
use ember_core::queue::{Edge, Kind, QueueItem};
use ember_core::types::Identifier;
use ember_events::{Message, PublishError, Publisher, TraceContext};
use ember_executor::telemetry::init_tracing;
use ember_executor::Dispatcher;
use tokio::sync::{Barrier, Notify};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn identifier(function: &Function) -> Identifier {
    Identifier {
        run_id: Uuid::now_v7(),
        workflow_id: function.id,
        workflow_version: function.function_version,
        account_id: Uuid::new_v4(),
        workspace_id: Uuid::new_v4(),
        app_id: Uuid::new_v4(),
        event_id: None,
    }
}

pub fn function(slug: &str) -> Function {
    Function::new(Uuid::new_v4(), slug)
}

/// A step item for `function` travelling along `edge`.
pub fn step_item(kind: Kind, function: &Function, edge: Edge) -> QueueItem {
    QueueItem::new(
        kind,
        identifier(function),
        serde_json::json!({ "edge": edge }),
    )
    .with_job_id(format!("job-{}", Uuid::new_v4()))
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Engine fake with scripted `execute` results.
#[derive(Default)]
pub struct FakeExecutor {
    execute_results: Mutex<VecDeque<Result<Option<DriverResponse>, ExecuteFailure>>>,
    pub executed: Mutex<Vec<(Identifier, Edge)>>,
    /// Trace context active during each `execute` call.
    pub traces: Mutex<Vec<Option<TraceContext>>>,
    /// When set, `execute` blocks until `release` is notified.
    pub gated: AtomicBool,
    pub release: Notify,

    pub resume_error: Mutex<Option<ExecutionError>>,
    pub resumed: Mutex<Vec<(Pause, ResumeRequest)>>,

    pub schedule_error: Mutex<Option<ExecutionError>>,
    pub scheduled: Mutex<Vec<ScheduleRequest>>,

    pub batch_error: Mutex<Option<ExecutionError>>,
    pub batches: Mutex<Vec<(Function, ScheduleBatchPayload)>>,

    pub finalizer: Mutex<Option<Arc<dyn Finalizer>>>,
    pub listeners_closed: AtomicBool,
}

impl FakeExecutor {
    /// Queue the result of the next `execute` call. Unscripted calls return
    /// `Ok(None)`.
    pub fn push_execute(&self, result: Result<Option<DriverResponse>, ExecuteFailure>) {
        self.execute_results.lock().unwrap().push_back(result);
    }

    pub fn execute_calls(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn finalizer(&self) -> Option<Arc<dyn Finalizer>> {
        self.finalizer.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(
        &self,
        id: &Identifier,
        _item: &QueueItem,
        edge: &Edge,
    ) -> Result<Option<DriverResponse>, ExecuteFailure> {
        self.executed
            .lock()
            .unwrap()
            .push((id.clone(), edge.clone()));
        self.traces.lock().unwrap().push(TraceContext::current());
        if self.gated.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.execute_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn resume_pause_timeout(
        &self,
        pause: &Pause,
        request: ResumeRequest,
    ) -> Result<(), ExecutionError> {
        self.resumed.lock().unwrap().push((pause.clone(), request));
        match self.resume_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn schedule(&self, request: ScheduleRequest) -> Result<Option<RunMetadata>, ExecutionError> {
        let id = Identifier {
            run_id: Uuid::now_v7(),
            workflow_id: request.function.id,
            workflow_version: request.function.function_version,
            account_id: request.account_id,
            workspace_id: request.workspace_id,
            app_id: request.app_id,
            event_id: request.events.first().map(|e| e.internal_id),
        };
        self.scheduled.lock().unwrap().push(request);
        match self.schedule_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(Some(RunMetadata { id })),
        }
    }

    async fn retrieve_and_schedule_batch(
        &self,
        function: &Function,
        payload: ScheduleBatchPayload,
    ) -> Result<(), ExecutionError> {
        self.batches.lock().unwrap().push((function.clone(), payload));
        match self.batch_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_finalizer(&self, finalizer: Arc<dyn Finalizer>) {
        *self.finalizer.lock().unwrap() = Some(finalizer);
    }

    async fn close_lifecycle_listeners(&self) {
        self.listeners_closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Debounce store holding at most one record.
#[derive(Default)]
pub struct FakeDebouncer {
    pub record: Mutex<Option<DebounceItem>>,
    /// When set, the next `start_execution` reports a migration.
    pub migrating: AtomicBool,
    pub fail_delete: AtomicBool,
    pub started: Mutex<Vec<Uuid>>,
    pub deleted: Mutex<Vec<Uuid>>,
}

impl FakeDebouncer {
    pub fn with_record(record: DebounceItem) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Debouncer for FakeDebouncer {
    async fn get_debounce_item(
        &self,
        _debounce_id: Uuid,
        _account_id: Uuid,
    ) -> Result<DebounceItem, DebounceError> {
        self.record
            .lock()
            .unwrap()
            .clone()
            .ok_or(DebounceError::NotFound)
    }

    async fn start_execution(
        &self,
        _item: &DebounceItem,
        _function: &Function,
        debounce_id: Uuid,
    ) -> Result<(), DebounceError> {
        if self.migrating.load(Ordering::SeqCst) {
            return Err(DebounceError::Migrating);
        }
        self.started.lock().unwrap().push(debounce_id);
        Ok(())
    }

    async fn delete_debounce_item(
        &self,
        debounce_id: Uuid,
        _item: &DebounceItem,
        _account_id: Uuid,
    ) -> Result<(), DebounceError> {
        self.deleted.lock().unwrap().push(debounce_id);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DebounceError::Storage("connection reset".into()));
        }
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

pub fn debounce_item(function: &Function) -> DebounceItem {
    let event = Event::new("app/user.updated", serde_json::json!({ "user": 42 }));
    DebounceItem {
        account_id: Uuid::new_v4(),
        workspace_id: Uuid::new_v4(),
        app_id: Uuid::new_v4(),
        function_id: function.id,
        function_version: function.function_version,
        event_id: Uuid::now_v7(),
        event,
        function_paused_at: None,
    }
}

// ---------------------------------------------------------------------------
// Batch manager
// ---------------------------------------------------------------------------

/// Batch store with an atomic start transition.
#[derive(Default)]
pub struct FakeBatcher {
    present: Mutex<HashSet<Uuid>>,
    started: Mutex<HashSet<Uuid>>,
    pub fail_delete: AtomicBool,
    pub deleted: Mutex<Vec<Uuid>>,
}

impl FakeBatcher {
    /// Make a batch available for starting.
    pub fn add(&self, batch_id: Uuid) {
        self.present.lock().unwrap().insert(batch_id);
    }
}

#[async_trait]
impl BatchManager for FakeBatcher {
    async fn start_execution(
        &self,
        _function_id: Uuid,
        batch_id: Uuid,
        _batch_pointer: &str,
    ) -> Result<BatchStatus, BatchError> {
        if !self.present.lock().unwrap().contains(&batch_id) {
            return Ok(BatchStatus::Absent);
        }
        if !self.started.lock().unwrap().insert(batch_id) {
            return Ok(BatchStatus::Started);
        }
        Ok(BatchStatus::Ready)
    }

    async fn delete_keys(&self, _function_id: Uuid, batch_id: Uuid) -> Result<(), BatchError> {
        self.deleted.lock().unwrap().push(batch_id);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BatchError::Storage("connection reset".into()));
        }
        self.present.lock().unwrap().remove(&batch_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Publisher that records messages and can fail or rendezvous on demand.
#[derive(Default)]
pub struct FakePublisher {
    pub published: Mutex<Vec<(String, Message)>>,
    /// Fail the publish with this zero-based call index.
    pub fail_at: Option<usize>,
    /// Every publish waits here before completing.
    pub barrier: Option<Barrier>,
    calls: AtomicUsize,
}

impl FakePublisher {
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Publishes only complete once `n` of them are in flight together.
    pub fn rendezvous(n: usize) -> Self {
        Self {
            barrier: Some(Barrier::new(n)),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, Message)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), PublishError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(call) {
            return Err(PublishError::Transport {
                topic: topic.to_string(),
                reason: "broker unavailable".into(),
            });
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), message));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Span fields
// ---------------------------------------------------------------------------

/// Layer collecting the fields of every span with a given name, including
/// fields recorded after creation.
#[derive(Clone)]
pub struct SpanFields {
    name: &'static str,
    fields: Arc<Mutex<BTreeMap<String, String>>>,
}

impl SpanFields {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Arc::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<String> {
        self.fields.lock().unwrap().get(field).cloned()
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for SpanFields
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() == self.name {
            attrs.record(&mut FieldVisitor(&mut self.fields.lock().unwrap()));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if ctx.span(id).is_some_and(|span| span.name() == self.name) {
            values.record(&mut FieldVisitor(&mut self.fields.lock().unwrap()));
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A dispatcher wired to fresh fakes.
pub struct Harness {
    pub executor: Arc<FakeExecutor>,
    pub catalog: Arc<InMemoryCatalog>,
    pub debouncer: Arc<FakeDebouncer>,
    pub batcher: Arc<FakeBatcher>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    /// A harness whose catalog holds no functions.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(functions: impl IntoIterator<Item = Function>) -> Self {
        Self::with_debouncer(functions, FakeDebouncer::default())
    }

    pub fn with_debouncer(
        functions: impl IntoIterator<Item = Function>,
        debouncer: FakeDebouncer,
    ) -> Self {
        init_tracing("ember_executor=debug");

        let executor = Arc::new(FakeExecutor::default());
        let catalog = Arc::new(InMemoryCatalog::new(functions));
        let debouncer = Arc::new(debouncer);
        let batcher = Arc::new(FakeBatcher::default());
        let dispatcher = Dispatcher::new(
            executor.clone(),
            catalog.clone(),
            debouncer.clone(),
            batcher.clone(),
        );
        Self {
            executor,
            catalog,
            debouncer,
            batcher,
            dispatcher,
        }
    }
}
