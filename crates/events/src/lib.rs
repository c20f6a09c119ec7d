//! Event-stream publishing for the Ember executor.
//!
//! - [`Publisher`]: publishes a [`Message`] to a named topic.
//! - [`BroadcastPublisher`]: in-process publisher backed by
//!   `tokio::sync::broadcast`, used by the lightweight deployment.
//! - [`TraceContext`] / [`TraceCarrier`]: W3C trace-context propagation
//!   alongside published messages; [`TraceLayer`] ties contexts to
//!   `tracing` spans.
//! - [`EventStreamConfig`]: topic and buffer configuration.

pub mod bus;
pub mod config;
pub mod publisher;
pub mod trace;

pub use bus::{BroadcastPublisher, Published};
pub use config::EventStreamConfig;
pub use publisher::{Message, PublishError, Publisher};
pub use trace::{TraceCarrier, TraceContext, TraceLayer};
