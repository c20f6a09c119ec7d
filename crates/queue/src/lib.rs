//! Queue delivery contract for the Ember executor.
//!
//! - [`Queue`]: push-style delivery of [`QueueItem`]s to a [`QueueHandler`].
//! - [`RunResult`] / [`HandlerError`]: the instruction a handler returns:
//!   acknowledge, reschedule immediately, or retry under a [`RetryPolicy`].
//! - [`MemoryQueue`]: the in-process queue used by the lightweight
//!   deployment.

pub mod error;
pub mod handler;
pub mod memory;

pub use ember_core::queue::{Kind, QueueItem, RunInfo};
pub use error::{HandlerError, QueueError, RetryPolicy};
pub use handler::{Queue, QueueHandler, RunResult};
pub use memory::{MemoryQueue, MemoryQueueConfig};
