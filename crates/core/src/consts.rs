//! Names shared between the dispatcher and the event stream.

/// Name under which completed-run events are published to the event stream.
pub const EVENT_RECEIVED_NAME: &str = "event/event.received";

/// Message metadata key holding the serialized trace carrier.
pub const OTEL_PROPAGATION_KEY: &str = "sys.trace";

/// Instrumentation scope for spans opened when a debounce times out.
pub const OTEL_SCOPE_DEBOUNCE: &str = "debounce.execution";

/// Name of the event an invoke-timeout failure is reported under.
pub const INVOKE_TIMEOUT_ERROR_NAME: &str = "InvokeTimeoutError";

/// Message of the invoke-timeout failure.
pub const INVOKE_TIMEOUT_ERROR_MESSAGE: &str =
    "Timed out waiting for invoked function to complete";
