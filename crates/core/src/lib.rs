//! Domain types and collaborator contracts for the Ember executor.
//!
//! This crate has no knowledge of how items are queued or how events are
//! transported. It defines:
//!
//! - the queue item envelope and its kind-specific payloads ([`queue`]),
//! - run identity, functions, events, and pauses,
//! - the traits the dispatcher calls out to: [`execution::Executor`],
//!   [`catalog::FunctionCatalog`], [`debounce::Debouncer`], and
//!   [`batch::BatchManager`],
//! - the typed error taxonomy those collaborators report ([`error`]).

pub mod batch;
pub mod catalog;
pub mod config;
pub mod consts;
pub mod debounce;
pub mod error;
pub mod event;
pub mod execution;
pub mod function;
pub mod pause;
pub mod queue;
pub mod types;
