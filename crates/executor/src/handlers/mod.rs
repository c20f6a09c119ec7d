//! Per-kind queue item handlers.
//!
//! Each submodule adds one `handle_*` method to
//! [`Dispatcher`](crate::dispatcher::Dispatcher). Handlers do not log their
//! failures; they return them to the dispatch loop, which logs once.

mod batch;
mod debounce;
mod pause;
mod step;

pub use step::StepOutcome;
