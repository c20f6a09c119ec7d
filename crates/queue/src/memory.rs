//! In-process queue for the lightweight deployment.
//!
//! [`MemoryQueue`] holds items in an unbounded channel and pushes each one
//! to the handler on its own Tokio task, bounded by a semaphore. Failed
//! deliveries are re-enqueued with exponential backoff according to the
//! handler's [`RetryPolicy`]. Nothing survives a restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ember_core::config::{env_or, ConfigError};
use ember_core::queue::{QueueItem, RunInfo};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, RetryPolicy};
use crate::handler::{Queue, QueueHandler};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Default number of items handled concurrently.
const DEFAULT_CONCURRENCY: usize = 16;

/// Default attempt budget for items that do not set their own.
const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Tunable parameters for delivery and retry backoff.
#[derive(Debug, Clone)]
pub struct MemoryQueueConfig {
    /// Maximum number of in-flight deliveries.
    pub concurrency: usize,
    /// Attempt budget for items without `max_attempts`.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between retries.
    pub max_backoff: Duration,
    /// Factor by which the delay grows after each failed attempt.
    pub multiplier: f64,
}

impl Default for MemoryQueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl MemoryQueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `QUEUE_CONCURRENCY`       | `16`    |
    /// | `QUEUE_MAX_ATTEMPTS`      | `4`     |
    /// | `QUEUE_BACKOFF_INITIAL_MS`| `1000`  |
    /// | `QUEUE_BACKOFF_MAX_MS`    | `30000` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            concurrency: env_or("QUEUE_CONCURRENCY", defaults.concurrency)?,
            max_attempts: env_or("QUEUE_MAX_ATTEMPTS", defaults.max_attempts)?,
            initial_backoff: Duration::from_millis(env_or(
                "QUEUE_BACKOFF_INITIAL_MS",
                defaults.initial_backoff.as_millis() as u64,
            )?),
            max_backoff: Duration::from_millis(env_or(
                "QUEUE_BACKOFF_MAX_MS",
                defaults.max_backoff.as_millis() as u64,
            )?),
            multiplier: defaults.multiplier,
        })
    }
}

/// Delay before re-delivering an item that failed on `attempt`.
///
/// The result is clamped to [`MemoryQueueConfig::max_backoff`].
pub fn backoff_delay(attempt: u32, config: &MemoryQueueConfig) -> Duration {
    let factor = config.multiplier.powi(attempt.min(32) as i32);
    let delay_ms = (config.initial_backoff.as_millis() as f64 * factor) as u64;
    Duration::from_millis(delay_ms).min(config.max_backoff)
}

// ---------------------------------------------------------------------------
// MemoryQueue
// ---------------------------------------------------------------------------

struct Envelope {
    item: QueueItem,
    available_at: Instant,
}

/// Unbounded in-process queue with push-style delivery.
pub struct MemoryQueue {
    config: MemoryQueueConfig,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
}

impl MemoryQueue {
    pub fn new(config: MemoryQueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Make `item` available immediately.
    pub fn enqueue(&self, item: QueueItem) -> Result<(), QueueError> {
        self.tx
            .send(Envelope {
                item,
                available_at: Instant::now(),
            })
            .map_err(|_| QueueError::Closed)
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(MemoryQueueConfig::default())
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn run(
        &self,
        handler: Arc<dyn QueueHandler>,
        cancel: CancellationToken,
    ) -> Result<(), QueueError> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or(QueueError::AlreadyRunning)?;
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        tracing::info!(
            concurrency = self.config.concurrency,
            max_attempts = self.config.max_attempts,
            "Memory queue started",
        );

        loop {
            let envelope = tokio::select! {
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    // Hand the item back so a later run can deliver it.
                    let _ = self.tx.send(envelope);
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let handler = Arc::clone(&handler);
            let tx = self.tx.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                deliver(handler.as_ref(), tx, &config, envelope).await;
                drop(permit);
            });
        }

        *self.rx.lock().await = Some(rx);
        tracing::info!("Memory queue stopped");
        Ok(())
    }
}

/// Hand one item to the handler and apply the returned retry policy.
async fn deliver(
    handler: &dyn QueueHandler,
    tx: mpsc::UnboundedSender<Envelope>,
    config: &MemoryQueueConfig,
    envelope: Envelope,
) {
    let Envelope { item, available_at } = envelope;
    let info = RunInfo {
        attempt: item.attempt,
        latency: Instant::now().saturating_duration_since(available_at),
    };

    let err = match handler.handle(info, item.clone()).await {
        Ok(result) => {
            if result.scheduled_immediate_job {
                tracing::trace!(
                    run_id = %item.identifier.run_id,
                    kind = %item.kind,
                    "Handler scheduled an immediate continuation",
                );
            }
            return;
        }
        Err(e) => e,
    };

    let max_attempts = item.max_attempts.unwrap_or(config.max_attempts);
    let mut retry = item;
    match err.policy() {
        RetryPolicy::Never => {
            tracing::warn!(
                run_id = %retry.identifier.run_id,
                kind = %retry.kind,
                error = %err,
                "Dropping item after non-retriable error",
            );
            return;
        }
        RetryPolicy::Default => {
            if retry.attempt + 1 >= max_attempts {
                tracing::error!(
                    run_id = %retry.identifier.run_id,
                    kind = %retry.kind,
                    attempts = retry.attempt + 1,
                    error = %err,
                    "Item exhausted its attempts",
                );
                return;
            }
            retry.attempt += 1;
        }
        // Attempt budget is not consumed.
        RetryPolicy::Always => {}
    }

    let delay = backoff_delay(retry.attempt, config);
    tracing::debug!(
        run_id = %retry.identifier.run_id,
        kind = %retry.kind,
        attempt = retry.attempt,
        delay_ms = delay.as_millis() as u64,
        "Re-enqueueing item",
    );
    schedule(tx, retry, delay);
}

fn schedule(tx: mpsc::UnboundedSender<Envelope>, item: QueueItem, delay: Duration) {
    tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let envelope = Envelope {
            item,
            available_at: Instant::now(),
        };
        if tx.send(envelope).is_err() {
            tracing::warn!("Memory queue closed, dropping delayed item");
        }
    });
}
