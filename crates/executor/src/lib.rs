//! The Ember execution dispatcher.
//!
//! Consumes queue items and drives durable function runs:
//!
//! - [`Dispatcher`]: per-item entry point; routes by kind and maps handler
//!   outcomes to queue instructions.
//! - [`handlers`]: step execution, pause timeouts, scheduled batches and
//!   debounce timeouts.
//! - [`RunFinalizer`]: publishes a completed run's events.
//! - [`ExecutorService`]: lifecycle around the dispatcher and the queue.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod finalizer;
pub mod handlers;
pub mod service;
pub mod telemetry;

pub use config::ExecutorConfig;
pub use dispatcher::Dispatcher;
pub use error::ExecutorError;
pub use finalizer::RunFinalizer;
pub use handlers::StepOutcome;
pub use service::{ExecutorService, ExecutorServiceBuilder};
