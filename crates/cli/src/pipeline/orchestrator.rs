//! Pipeline orchestrator - drives a simulated workload through the dispatcher.
//!
//! Producers enqueue control messages round-robin over the configured
//! sessions; every session is wrapped so the orchestrator learns when each
//! message actually left the queue.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{
    ContractError, ControlMessage, DispatchBlueprint, Endpoint, PeerSession, SessionId,
    SharedSession,
};
use dispatcher::{
    create_sessions, Clock, DispatchHandle, DispatcherBuilder, LogSession, SystemClock,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RunStats, StopReason};
use crate::error::CliError;

/// Content type stamped on simulated messages
pub const SIMULATED_CONTENT_TYPE: &str = "application/x-msnmsgrp2p";

/// Shape of the simulated load
#[derive(Debug, Clone)]
pub struct Workload {
    /// Total messages to enqueue
    pub messages: u64,
    /// Concurrent producers
    pub producers: usize,
    /// Pause between two enqueues of one producer
    pub interval: Duration,
    /// Payload size in bytes
    pub payload_size: usize,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            messages: 100,
            producers: 4,
            interval: Duration::from_millis(10),
            payload_size: 64,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scheduler settings and sessions
    pub blueprint: DispatchBlueprint,

    pub workload: Workload,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// What a wrapped session saw for one message
#[derive(Debug, Clone)]
struct DeliveryRecord {
    session: SessionId,
    sequence: u64,
    delivered_at: Instant,
    ok: bool,
}

/// Wraps a session and reports every send outcome
struct ObservedSession {
    inner: SharedSession<ControlMessage>,
    clock: Arc<dyn Clock>,
    records: mpsc::UnboundedSender<DeliveryRecord>,
}

impl PeerSession<ControlMessage> for ObservedSession {
    fn id(&self) -> &SessionId {
        self.inner.id()
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.inner.endpoint()
    }

    fn send(&self, message: ControlMessage) -> Result<(), ContractError> {
        let sequence = message.sequence;
        let result = self.inner.send(message);
        // The receiver outlives the dispatcher; a closed channel only loses stats.
        let _ = self.records.send(DeliveryRecord {
            session: self.inner.id().clone(),
            sequence,
            delivered_at: self.clock.now(),
            ok: result.is_ok(),
        });
        result
    }
}

type SubmitLog = Arc<Mutex<HashMap<u64, Instant>>>;

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the workload to completion and shut the dispatcher down
    pub async fn run(self) -> Result<RunStats> {
        self.run_until(std::future::pending::<StopReason>()).await
    }

    /// Run the workload until it completes or `stop` resolves
    ///
    /// An early stop only ends production. The dispatcher is still shut down
    /// with the configured policy, so every accepted entry ends up sent,
    /// handed back or retained, and the stats account for it.
    pub async fn run_until<F>(self, stop: F) -> Result<RunStats>
    where
        F: Future<Output = StopReason>,
    {
        let start_time = Instant::now();
        let workload = &self.config.workload;
        if workload.producers == 0 {
            return Err(CliError::invalid_workload("at least one producer is required").into());
        }

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let (record_tx, mut record_rx) = mpsc::unbounded_channel();
        let sessions = self.build_sessions(Arc::clone(&clock), record_tx).await?;

        let scheduler = self.config.blueprint.scheduler.clone();
        let policy = scheduler.shutdown_policy;
        let mut dispatcher = DispatcherBuilder::new(scheduler)
            .with_clock(Arc::clone(&clock))
            .build::<ControlMessage>()
            .map_err(CliError::from)?;

        info!(
            threshold_ms = dispatcher.delay_threshold().as_millis(),
            tick_ms = dispatcher.tick_interval().as_millis(),
            sessions = sessions.len(),
            messages = workload.messages,
            producers = workload.producers,
            "Dispatcher running"
        );

        let submitted: SubmitLog = Arc::new(Mutex::new(HashMap::new()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let producers: Vec<JoinHandle<u64>> = (0..workload.producers)
            .map(|index| {
                tokio::spawn(produce(
                    index,
                    workload.clone(),
                    dispatcher.handle(),
                    Arc::clone(&sessions),
                    Arc::clone(&clock),
                    Arc::clone(&submitted),
                    stop_rx.clone(),
                ))
            })
            .collect();

        let joined = async {
            let mut enqueued = 0u64;
            for producer in producers {
                enqueued += producer.await.context("Producer task failed")?;
            }
            Ok::<u64, anyhow::Error>(enqueued)
        };
        tokio::pin!(joined);

        let finished = tokio::select! {
            result = &mut joined => Ok(result),
            reason = stop => Err(reason),
        };
        let (enqueued, interrupted) = match finished {
            Ok(result) => (result?, None),
            Err(reason) => {
                warn!(%reason, "Stopping producers early");
                // `stop_rx` is still alive, so the send cannot fail.
                let _ = stop_tx.send(true);
                (joined.await?, Some(reason))
            }
        };
        info!(enqueued, "All producers finished");

        info!(?policy, pending = dispatcher.pending_len(), "Shutting down dispatcher...");
        let report = dispatcher.shutdown(policy).await.map_err(CliError::from)?;

        let submitted = submitted.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = RunStats::new(dispatcher.delay_threshold(), policy);
        stats.sessions = sessions.len();
        stats.enqueued = enqueued;
        stats.interrupted = interrupted;
        stats.metrics = report.metrics;
        stats.retained = report.pending;
        stats.latency.record_discarded(report.discarded.len() as u64);

        while let Ok(record) = record_rx.try_recv() {
            if !record.ok {
                stats.latency.record_failure();
                continue;
            }
            match submitted.get(&record.sequence) {
                Some(at) => {
                    let latency = record.delivered_at.saturating_duration_since(*at);
                    stats.latency.record(&record.session, latency);
                }
                None => warn!(sequence = record.sequence, "Delivery without submission"),
            }
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            dispatched = stats.metrics.dispatched_count,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Create the configured sessions, or a single log session if none
    async fn build_sessions(
        &self,
        clock: Arc<dyn Clock>,
        records: mpsc::UnboundedSender<DeliveryRecord>,
    ) -> Result<Arc<[SharedSession<ControlMessage>]>> {
        let mut sessions = create_sessions(&self.config.blueprint.sessions)
            .await
            .map_err(CliError::from)
            .context("Failed to create sessions")?;

        if sessions.is_empty() {
            warn!("No sessions configured - using a single log session");
            sessions.push(Arc::new(LogSession::new("loopback")));
        }

        Ok(sessions
            .into_iter()
            .map(|inner| -> SharedSession<ControlMessage> {
                Arc::new(ObservedSession {
                    inner,
                    clock: Arc::clone(&clock),
                    records: records.clone(),
                })
            })
            .collect())
    }
}

/// One producer: sequences `index`, `index + producers`, ...
async fn produce(
    index: usize,
    workload: Workload,
    handle: DispatchHandle<ControlMessage>,
    sessions: Arc<[SharedSession<ControlMessage>]>,
    clock: Arc<dyn Clock>,
    submitted: SubmitLog,
    mut stop: watch::Receiver<bool>,
) -> u64 {
    let mut accepted = 0u64;
    let mut ticker = tokio::time::interval(workload.interval.max(Duration::from_millis(1)));

    for sequence in (index as u64..workload.messages).step_by(workload.producers) {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = stop.changed() => {
                debug!(producer = index, accepted, "Producer stopped early");
                break;
            }
        }

        let session = Arc::clone(&sessions[sequence as usize % sessions.len()]);
        let message = ControlMessage::new(
            sequence,
            SIMULATED_CONTENT_TYPE,
            simulated_payload(sequence, workload.payload_size),
        );

        // Stamped before enqueue, so measured latency never undercounts.
        submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sequence, clock.now());

        if handle.submit(session, message).is_accepted() {
            accepted += 1;
        } else {
            debug!(producer = index, sequence, "Submission ignored");
        }
    }

    accepted
}

fn simulated_payload(sequence: u64, size: usize) -> Bytes {
    (0..size)
        .map(|i| (sequence as usize + i) as u8)
        .collect::<Vec<u8>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SchedulerConfig, ShutdownPolicy};

    fn config(threshold_ms: u64, workload: Workload) -> PipelineConfig {
        PipelineConfig {
            blueprint: DispatchBlueprint {
                scheduler: SchedulerConfig::with_threshold(Duration::from_millis(threshold_ms)),
                ..Default::default()
            },
            workload,
            metrics_port: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_dispatches_every_message() {
        let workload = Workload {
            messages: 40,
            producers: 3,
            interval: Duration::from_millis(7),
            payload_size: 16,
        };

        let stats = Pipeline::new(config(200, workload)).run().await.unwrap();

        assert_eq!(stats.enqueued, 40);
        assert_eq!(stats.metrics.dispatched_count, 40);
        assert_eq!(stats.retained, 0);

        let summary = stats.latency.summary();
        assert_eq!(summary.total_dispatched, 40);
        assert_eq!(summary.below_threshold, 0);
        assert!(summary.within_bound(), "{summary}");
    }

    fn long_workload() -> Workload {
        Workload {
            messages: 10_000,
            producers: 2,
            interval: Duration::from_millis(5),
            payload_size: 8,
        }
    }

    fn with_policy(mut config: PipelineConfig, policy: ShutdownPolicy) -> PipelineConfig {
        config.blueprint.scheduler.shutdown_policy = policy;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_discard_accounts_for_every_entry() {
        let config = with_policy(config(200, long_workload()), ShutdownPolicy::Discard);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(450)).await;
            StopReason::Signal
        };

        let stats = Pipeline::new(config).run_until(stop).await.unwrap();

        assert_eq!(stats.interrupted, Some(StopReason::Signal));
        assert!(stats.enqueued > 0 && stats.enqueued < 10_000);
        assert!(stats.metrics.dispatched_count > 0);
        assert!(stats.metrics.discarded_count > 0);
        assert_eq!(stats.retained, 0);
        assert_eq!(
            stats.metrics.settled() + stats.retained as u64,
            stats.enqueued
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_retain_reports_retained_entries() {
        let config = with_policy(config(200, long_workload()), ShutdownPolicy::Retain);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(450)).await;
            StopReason::Timeout
        };

        let stats = Pipeline::new(config).run_until(stop).await.unwrap();

        assert_eq!(stats.interrupted, Some(StopReason::Timeout));
        assert!(stats.retained > 0);
        assert_eq!(stats.metrics.discarded_count, 0);
        assert_eq!(
            stats.metrics.settled() + stats.retained as u64,
            stats.enqueued
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_drain_sends_everything_accepted() {
        let config = with_policy(config(200, long_workload()), ShutdownPolicy::Drain);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(450)).await;
            StopReason::Signal
        };

        let stats = Pipeline::new(config).run_until(stop).await.unwrap();

        assert!(stats.enqueued < 10_000);
        assert_eq!(stats.metrics.dispatched_count, stats.enqueued);
        assert_eq!(stats.retained, 0);
        assert_eq!(stats.latency.summary().below_threshold, 0);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_zero_producers() {
        let workload = Workload {
            producers: 0,
            ..Default::default()
        };
        let result = Pipeline::new(config(100, workload)).run().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_simulated_payload_size() {
        let payload = simulated_payload(3, 5);
        assert_eq!(&payload[..], &[3, 4, 5, 6, 7]);
    }
}
