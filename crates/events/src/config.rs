use ember_core::config::{env_or, ConfigError};

/// Default topic completed-run events are published to.
const DEFAULT_TOPIC: &str = "events";

/// Default buffer capacity for the in-process broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Where and how events are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStreamConfig {
    pub topic: String,
    /// Buffer size of the in-process publisher.
    pub capacity: usize,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EventStreamConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default  |
    /// |-------------------------|----------|
    /// | `EVENT_STREAM_TOPIC`    | `events` |
    /// | `EVENT_STREAM_CAPACITY` | `1024`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            topic: env_or("EVENT_STREAM_TOPIC", DEFAULT_TOPIC.to_string())?,
            capacity: env_or("EVENT_STREAM_CAPACITY", DEFAULT_CAPACITY)?,
        })
    }
}
