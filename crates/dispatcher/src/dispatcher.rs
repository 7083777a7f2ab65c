//! DelayedDispatcher - drain timer and lifecycle for the pending queue
//!
//! The timer fires once immediately and then every tick interval. Each firing
//! moves the due prefix out of the queue under the lock and sends it after
//! the lock is released. With the default tick equal to the delay threshold,
//! an entry waits between one and two thresholds before its send.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use contracts::{SchedulerConfig, SharedSession, ShutdownPolicy};

use crate::clock::{Clock, SystemClock};
use crate::error::DispatcherError;
use crate::handle::{DispatchHandle, EnqueueOutcome};
use crate::metrics::{MetricsSnapshot, QueueMetrics};
use crate::queue::{PendingQueue, QueueEntry};

/// State shared by the controller, producer handles and the timer task
pub(crate) struct Shared<M> {
    pub(crate) queue: PendingQueue<M>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) delay_threshold: Duration,
    pub(crate) metrics: Arc<QueueMetrics>,
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Sends that returned Ok
    pub dispatched: usize,
    /// Sends that returned an error or panicked
    pub failed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.dispatched + self.failed
    }
}

impl<M: Send + 'static> Shared<M> {
    /// Dispatch every entry that is due now
    pub(crate) fn fire(&self) -> DrainReport {
        let now = self.clock.now();
        let due = self.queue.take_due(now, self.delay_threshold);
        let pending = self.queue.len();
        self.metrics.set_pending(pending);
        observability::record_pending(pending);

        let mut report = DrainReport::default();
        for entry in due {
            if self.deliver(entry, now) {
                report.dispatched += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.total() > 0 {
            debug!(
                dispatched = report.dispatched,
                failed = report.failed,
                pending,
                "Drain pass complete"
            );
        }
        report
    }

    /// Hand one entry to its session; failures stay contained here
    fn deliver(&self, entry: QueueEntry<M>, now: Instant) -> bool {
        let latency = entry.age(now);
        let QueueEntry {
            session, message, ..
        } = entry;

        match panic::catch_unwind(AssertUnwindSafe(|| session.send(message))) {
            Ok(Ok(())) => {
                self.metrics.inc_dispatched_count();
                observability::record_dispatch(true, latency);
                debug!(
                    session = %session.id(),
                    endpoint = session.endpoint().map(|e| e.id.as_str()),
                    latency_ms = millis(latency),
                    "Message dispatched"
                );
                true
            }
            Ok(Err(e)) => {
                self.metrics.inc_failure_count();
                observability::record_dispatch(false, latency);
                error!(
                    session = %session.id(),
                    error = %e,
                    "Send failed"
                );
                false
            }
            Err(payload) => {
                self.metrics.inc_failure_count();
                observability::record_dispatch(false, latency);
                error!(
                    session = %session.id(),
                    panic = panic_message(payload.as_ref()),
                    "Session panicked during send"
                );
                false
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Builder for creating a DelayedDispatcher
pub struct DispatcherBuilder {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<QueueMetrics>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder using the system clock
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock::new()),
            metrics: None,
        }
    }

    /// Stamp and age entries with a custom clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: Arc<QueueMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the dispatcher and start its drain timer
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(
            threshold_ms = self.config.delay_threshold_ms,
            tick_ms = millis(self.config.tick_interval())
        )
    )]
    pub fn build<M: Send + 'static>(self) -> Result<DelayedDispatcher<M>, DispatcherError> {
        let delay_threshold = self.config.delay_threshold();
        let tick_interval = self.config.tick_interval();

        if delay_threshold.is_zero() {
            return Err(DispatcherError::invalid_config(
                "delay_threshold_ms",
                "must be > 0",
            ));
        }
        if tick_interval.is_zero() {
            return Err(DispatcherError::invalid_config(
                "tick_interval_ms",
                "must be > 0",
            ));
        }
        if tick_interval > delay_threshold {
            warn!("Tick interval exceeds delay threshold; latency may exceed twice the threshold");
        }

        let shared = Arc::new(Shared {
            queue: PendingQueue::new(),
            clock: self.clock,
            delay_threshold,
            metrics: self.metrics.unwrap_or_default(),
        });

        // First tick completes immediately, so the first firing happens at start.
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(timer_loop(Arc::clone(&shared), ticker, stop_rx));

        info!("Dispatcher started");

        Ok(DelayedDispatcher {
            shared,
            config: self.config,
            timer: Some(TimerTask {
                stop_tx: Some(stop_tx),
                join,
            }),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum StopMode {
    Now,
    WhenEmpty,
}

struct TimerTask {
    stop_tx: Option<oneshot::Sender<StopMode>>,
    join: JoinHandle<()>,
}

#[instrument(name = "dispatcher_timer_loop", skip_all)]
async fn timer_loop<M: Send + 'static>(
    shared: Arc<Shared<M>>,
    mut ticker: Interval,
    mut stop_rx: oneshot::Receiver<StopMode>,
) {
    debug!("Drain timer started");
    let mut draining = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.fire();
                if draining && shared.queue.is_empty() {
                    break;
                }
            }
            mode = &mut stop_rx, if !draining => match mode {
                Ok(StopMode::WhenEmpty) if !shared.queue.is_empty() => {
                    debug!(pending = shared.queue.len(), "Draining before stop");
                    draining = true;
                }
                _ => break,
            },
        }
    }

    debug!("Drain timer stopped");
}

/// Result of [`DelayedDispatcher::shutdown`]
#[derive(Debug)]
pub struct ShutdownReport<M> {
    pub policy: ShutdownPolicy,
    /// Entries still queued after the timer stopped (Retain only)
    pub pending: usize,
    /// Entries handed back to the caller, in FIFO order (Discard only)
    pub discarded: Vec<QueueEntry<M>>,
    pub metrics: MetricsSnapshot,
}

/// Delayed dispatch scheduler
///
/// Owns the pending queue and the drain timer. Producers enqueue through
/// [`DelayedDispatcher::handle`] clones or directly on the dispatcher.
pub struct DelayedDispatcher<M: Send + 'static> {
    shared: Arc<Shared<M>>,
    config: SchedulerConfig,
    timer: Option<TimerTask>,
}

impl<M: Send + 'static> DelayedDispatcher<M> {
    /// Start a dispatcher on the system clock
    pub fn spawn(config: SchedulerConfig) -> Result<Self, DispatcherError> {
        DispatcherBuilder::new(config).build()
    }

    /// Cloneable producer handle
    pub fn handle(&self) -> DispatchHandle<M> {
        DispatchHandle::new(Arc::clone(&self.shared))
    }

    /// Queue `message` for `session`; absent inputs are a no-op
    pub fn enqueue(
        &self,
        session: Option<SharedSession<M>>,
        message: Option<M>,
    ) -> EnqueueOutcome {
        self.handle().enqueue(session, message)
    }

    /// Queue a message for a session that is known to be present
    pub fn submit(&self, session: SharedSession<M>, message: M) -> EnqueueOutcome {
        self.handle().enqueue(Some(session), Some(message))
    }

    pub fn pending_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Age of the oldest pending entry
    pub fn oldest_pending_age(&self) -> Option<Duration> {
        self.shared.queue.oldest_age(self.shared.clock.now())
    }

    pub fn delay_threshold(&self) -> Duration {
        self.shared.delay_threshold
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.shared.metrics
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Dispatch the currently due entries on demand
    ///
    /// Only available once the timer has been stopped with
    /// [`ShutdownPolicy::Retain`]; the due rule is the same as the timer's.
    pub fn drain_due(&self) -> Result<DrainReport, DispatcherError> {
        if self.is_running() {
            return Err(DispatcherError::TimerRunning);
        }
        Ok(self.shared.fire())
    }

    /// Stop the drain timer
    ///
    /// Enqueue becomes a no-op as soon as this is called. What happens to
    /// entries still queued depends on `policy`:
    /// - `Drain`: the timer keeps its cadence until the queue is empty
    /// - `Discard`: entries are returned in the report
    /// - `Retain`: entries stay queued for [`DelayedDispatcher::drain_due`]
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(pending = self.pending_len()))]
    pub async fn shutdown(
        &mut self,
        policy: ShutdownPolicy,
    ) -> Result<ShutdownReport<M>, DispatcherError> {
        let timer = self.timer.as_mut().ok_or(DispatcherError::AlreadyStopped)?;
        self.shared.queue.close();

        let mode = match policy {
            ShutdownPolicy::Drain => StopMode::WhenEmpty,
            ShutdownPolicy::Discard | ShutdownPolicy::Retain => StopMode::Now,
        };
        // A retried shutdown after cancellation keeps the first stop mode.
        if let Some(stop_tx) = timer.stop_tx.take() {
            let _ = stop_tx.send(mode);
        }
        // The task stays owned until it finishes, so cancelling this future
        // leaves Drop to abort it.
        let joined = (&mut timer.join).await;
        self.timer = None;
        joined?;

        let discarded = if policy == ShutdownPolicy::Discard {
            let entries = self.shared.queue.take_all();
            self.shared.metrics.add_discarded_count(entries.len() as u64);
            observability::record_discarded(entries.len());
            entries
        } else {
            Vec::new()
        };

        let pending = self.shared.queue.len();
        self.shared.metrics.set_pending(pending);
        observability::record_pending(pending);

        let metrics = self.shared.metrics.snapshot();
        info!(
            ?policy,
            pending,
            discarded = discarded.len(),
            dispatched = metrics.dispatched_count,
            failed = metrics.failure_count,
            "Dispatcher stopped"
        );

        Ok(ShutdownReport {
            policy,
            pending,
            discarded,
            metrics,
        })
    }

    /// Stop using the configured shutdown policy
    pub async fn shutdown_default(&mut self) -> Result<ShutdownReport<M>, DispatcherError> {
        let policy = self.config.shutdown_policy;
        self.shutdown(policy).await
    }
}

impl<M: Send + 'static> Drop for DelayedDispatcher<M> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.join.abort();
            let pending = self.shared.queue.len();
            if pending > 0 {
                warn!(
                    pending,
                    "Dispatcher dropped while running; pending entries will not be sent"
                );
            }
        }
    }
}
