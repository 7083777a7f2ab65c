//! Run statistics and summary output.

use std::fmt;
use std::time::Duration;

use contracts::ShutdownPolicy;
use dispatcher::MetricsSnapshot;
use observability::LatencyAggregator;

/// Why a run ended before its workload was fully produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C or SIGTERM
    Signal,
    /// `--timeout` elapsed
    Timeout,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal => f.write_str("shutdown signal"),
            StopReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// Statistics from a simulated run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Configured delay threshold
    pub threshold: Duration,

    /// Policy used to stop the dispatcher
    pub policy: ShutdownPolicy,

    /// Number of sessions messages were spread over
    pub sessions: usize,

    /// Messages accepted by the queue
    pub enqueued: u64,

    /// Entries left queued after a retaining shutdown
    pub retained: usize,

    /// Set when production stopped early
    pub interrupted: Option<StopReason>,

    /// Total duration of the run
    pub duration: Duration,

    /// Dispatcher counters at shutdown
    pub metrics: MetricsSnapshot,

    /// Observed enqueue-to-send latency
    pub latency: LatencyAggregator,
}

impl RunStats {
    pub fn new(threshold: Duration, policy: ShutdownPolicy) -> Self {
        Self {
            threshold,
            policy,
            sessions: 0,
            enqueued: 0,
            retained: 0,
            interrupted: None,
            duration: Duration::ZERO,
            metrics: MetricsSnapshot::default(),
            latency: LatencyAggregator::new(threshold),
        }
    }

    /// Dispatched messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.dispatched_count as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Run Statistics                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        if let Some(reason) = self.interrupted {
            println!("   ├─ Stopped early: {}", reason);
        }
        println!("   ├─ Delay threshold: {} ms", self.threshold.as_millis());
        println!("   ├─ Shutdown policy: {:?}", self.policy);
        println!("   ├─ Sessions: {}", self.sessions);
        println!("   ├─ Enqueued: {}", self.enqueued);
        println!("   ├─ Dispatched: {}", self.metrics.dispatched_count);
        println!("   ├─ Failed: {}", self.metrics.failure_count);
        println!("   ├─ Discarded: {}", self.metrics.discarded_count);
        println!("   ├─ Retained: {}", self.retained);
        println!("   └─ Throughput: {:.2} msg/s", self.throughput());

        let summary = self.latency.summary();
        println!("\nLatency (ms)");
        println!("   ├─ Overall: {}", summary.latency_ms);
        println!("   ├─ Below threshold: {}", summary.below_threshold);
        println!(
            "   └─ Within twice the threshold: {}",
            if summary.within_bound() { "yes" } else { "no" }
        );

        if !summary.sessions.is_empty() {
            println!("\nPer session");
            let last = summary.sessions.len() - 1;
            for (i, (session, stats)) in summary.sessions.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!("   {} {}: {}", prefix, session, stats);
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SessionId;

    #[test]
    fn test_throughput() {
        let mut stats = RunStats::new(Duration::from_millis(100), ShutdownPolicy::Drain);
        assert_eq!(stats.throughput(), 0.0);

        stats.duration = Duration::from_secs(2);
        stats.metrics.dispatched_count = 50;
        assert!((stats.throughput() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Signal.to_string(), "shutdown signal");
        assert_eq!(StopReason::Timeout.to_string(), "timeout");
        assert!(RunStats::new(Duration::from_millis(1), ShutdownPolicy::Drain)
            .interrupted
            .is_none());
    }

    #[test]
    fn test_latency_threshold_carried() {
        let mut stats = RunStats::new(Duration::from_millis(100), ShutdownPolicy::Retain);
        stats
            .latency
            .record(&SessionId::new("a"), Duration::from_millis(50));
        assert_eq!(stats.latency.summary().below_threshold, 1);
    }
}
