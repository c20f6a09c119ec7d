//! W3C trace-context propagation for published messages.
//!
//! A [`TraceContext`] is found in one of two places:
//!
//! - the extensions of the current `tracing` span, when the subscriber has
//!   [`TraceLayer`] installed. Every span gets a context there, inherited
//!   from its parent span or from the enclosing scope.
//! - a Tokio task-local set by [`TraceContext::scope`], for work that
//!   arrives with a context from upstream.
//!
//! Publishers call [`TraceCarrier::from_current`] to capture whichever is
//! active.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::{LookupSpan, Registry};
use uuid::Uuid;

/// Carrier key for the W3C `traceparent` header.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// Only version `00` of the header format is produced or accepted.
const TRACEPARENT_VERSION: &str = "00";

const FLAG_SAMPLED: u8 = 0x01;

tokio::task_local! {
    static CURRENT: TraceContext;
}

// ---------------------------------------------------------------------------
// TraceContext
// ---------------------------------------------------------------------------

/// Identity of the span a unit of work runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub sampled: bool,
}

impl TraceContext {
    /// Start a new, sampled trace.
    pub fn new_root() -> Self {
        Self {
            trace_id: Uuid::new_v4().as_u128(),
            span_id: random_span_id(),
            sampled: true,
        }
    }

    /// A new span within the same trace.
    pub fn child(&self) -> Self {
        Self {
            span_id: random_span_id(),
            ..*self
        }
    }

    /// The active context: the current span's, else the enclosing
    /// [`scope`](Self::scope)'s.
    pub fn current() -> Option<Self> {
        Self::from_current_span().or_else(Self::scoped)
    }

    fn scoped() -> Option<Self> {
        CURRENT.try_with(|ctx| *ctx).ok()
    }

    fn from_current_span() -> Option<Self> {
        tracing::Span::current()
            .with_subscriber(|(id, dispatch)| {
                let registry = dispatch.downcast_ref::<Registry>()?;
                let span = registry.span(id)?;
                let ctx = span.extensions().get::<TraceContext>().copied();
                ctx
            })
            .flatten()
    }

    /// Run `fut` with `self` as the active context.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// Render as a `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{TRACEPARENT_VERSION}-{:032x}-{:016x}-{flags:02x}",
            self.trace_id, self.span_id
        )
    }

    /// Parse a `traceparent` header value.
    ///
    /// Returns `None` for malformed values and for all-zero ids, which the
    /// W3C format declares invalid.
    pub fn from_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let (version, trace, span, flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || version != TRACEPARENT_VERSION {
            return None;
        }
        if trace.len() != 32 || span.len() != 16 || flags.len() != 2 {
            return None;
        }
        let trace_id = u128::from_str_radix(trace, 16).ok()?;
        let span_id = u64::from_str_radix(span, 16).ok()?;
        let flags = u8::from_str_radix(flags, 16).ok()?;
        if trace_id == 0 || span_id == 0 {
            return None;
        }
        Some(Self {
            trace_id,
            span_id,
            sampled: flags & FLAG_SAMPLED != 0,
        })
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

fn random_span_id() -> u64 {
    // Never zero: an all-zero span id is invalid.
    (Uuid::new_v4().as_u128() as u64).max(1)
}

// ---------------------------------------------------------------------------
// TraceLayer
// ---------------------------------------------------------------------------

/// Subscriber layer that gives every new span a [`TraceContext`].
///
/// A span continues its parent's trace. A root span continues the scoped
/// context when there is one and starts a new trace otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let inherited = span
            .parent()
            .and_then(|parent| parent.extensions().get::<TraceContext>().copied())
            .or_else(TraceContext::scoped);
        let trace = match inherited {
            Some(parent) => parent.child(),
            None => TraceContext::new_root(),
        };
        span.extensions_mut().insert(trace);
    }
}

// ---------------------------------------------------------------------------
// TraceCarrier
// ---------------------------------------------------------------------------

/// Serializable key/value carrier stored in message metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCarrier {
    pub context: HashMap<String, String>,
}

impl TraceCarrier {
    /// A carrier holding the active context, or an empty one outside any
    /// traced scope.
    pub fn from_current() -> Self {
        let mut carrier = Self::default();
        if let Some(ctx) = TraceContext::current() {
            carrier.inject(&ctx);
        }
        carrier
    }

    pub fn inject(&mut self, ctx: &TraceContext) {
        self.context
            .insert(TRACEPARENT_KEY.to_string(), ctx.to_traceparent());
    }

    pub fn extract(&self) -> Option<TraceContext> {
        self.context
            .get(TRACEPARENT_KEY)
            .and_then(|v| TraceContext::from_traceparent(v))
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}
