use std::time::Duration;

use ember_core::config::{env_opt, ConfigError};
use ember_events::EventStreamConfig;

/// Executor configuration loaded from environment variables.
///
/// All fields have defaults suitable for the lightweight deployment.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Where completed-run events are published.
    pub event_stream: EventStreamConfig,
    /// Upper bound on concurrent publishes per run completion.
    /// `None` publishes every event at once.
    pub finalizer_max_concurrency: Option<usize>,
    /// Upper bound on how long `stop` waits for in-flight items.
    /// `None` waits indefinitely.
    pub drain_timeout: Option<Duration>,
}

impl ExecutorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Reads a `.env` file first when one is present.
    ///
    /// | Env Var                        | Default     |
    /// |--------------------------------|-------------|
    /// | `EVENT_STREAM_TOPIC`           | `events`    |
    /// | `EVENT_STREAM_CAPACITY`        | `1024`      |
    /// | `FINALIZER_MAX_CONCURRENCY`    | unbounded   |
    /// | `EXECUTOR_DRAIN_TIMEOUT_SECS`  | unbounded   |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let finalizer_max_concurrency =
            env_opt::<usize>("FINALIZER_MAX_CONCURRENCY")?.filter(|n| *n > 0);
        let drain_timeout =
            env_opt::<u64>("EXECUTOR_DRAIN_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Self {
            event_stream: EventStreamConfig::from_env()?,
            finalizer_max_concurrency,
            drain_timeout,
        })
    }
}
