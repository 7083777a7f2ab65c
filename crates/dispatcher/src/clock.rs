//! Clock - monotonic time source used to stamp and age queue entries
//!
//! `SystemClock` reads tokio's clock, so `tokio::time::pause()` makes it
//! deterministic in tests. `ManualClock` only moves when told to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync + 'static {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Real time, routed through tokio's time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Hand-driven clock for deterministic tests
///
/// Starts at an arbitrary origin and only advances through
/// [`ManualClock::advance`] or [`ManualClock::set_elapsed`]. Setting it
/// backwards is allowed, which lets tests simulate clock skew.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed_ns: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ns: AtomicU64::new(0),
        }
    }

    /// Move the clock forward, saturating at `u64::MAX` nanoseconds
    pub fn advance(&self, by: Duration) {
        let by = saturating_nanos(by);
        let _ = self
            .elapsed_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ns| {
                Some(ns.saturating_add(by))
            });
    }

    /// Put the clock at `elapsed` past its origin
    pub fn set_elapsed(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    /// Time since the origin
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::SeqCst))
    }

    /// The instant `elapsed` past the origin
    pub fn instant_at(&self, elapsed: Duration) -> Instant {
        self.origin + elapsed
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
