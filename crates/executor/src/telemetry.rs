use ember_events::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Every span gets a
/// trace context, so events published while a span is active carry it.
/// Returns `false` when a subscriber was already installed, which is
/// expected in tests.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(TraceLayer)
        .try_init()
        .is_ok()
}
