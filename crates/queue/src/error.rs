use ember_core::config::ConfigError;
use ember_core::error::BoxError;

/// How the queue should treat a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry with backoff until the item's attempt budget is exhausted.
    Default,
    /// Retry with backoff without consuming the attempt budget.
    Always,
    /// Drop the item.
    Never,
}

/// A handler's failure, tagged with the retry policy the queue must apply.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct HandlerError {
    policy: RetryPolicy,
    source: BoxError,
}

impl HandlerError {
    pub fn new(policy: RetryPolicy, source: impl Into<BoxError>) -> Self {
        Self {
            policy,
            source: source.into(),
        }
    }

    /// Retry under the queue's own attempt budget.
    pub fn retry(source: impl Into<BoxError>) -> Self {
        Self::new(RetryPolicy::Default, source)
    }

    /// Retry regardless of how many attempts have been made.
    pub fn always_retry(source: impl Into<BoxError>) -> Self {
        Self::new(RetryPolicy::Always, source)
    }

    /// Never retry.
    pub fn never_retry(source: impl Into<BoxError>) -> Self {
        Self::new(RetryPolicy::Never, source)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

/// Errors raised by the queue itself.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue is already running")]
    AlreadyRunning,

    #[error("queue is closed")]
    Closed,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
