//! DispatchBlueprint - Config Loader output
//!
//! Scheduler timing, shutdown behaviour and the sessions used by the CLI
//! simulation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::Contact;

/// Default minimum age before an entry may be dispatched
pub const DEFAULT_DELAY_THRESHOLD_MS: u64 = 5000;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatch scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Peer sessions to open
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// Delayed dispatch scheduler settings
///
/// Fixed at construction; not adjustable while the scheduler runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum age (ms) an entry must reach before dispatch
    #[serde(default = "default_delay_threshold_ms")]
    pub delay_threshold_ms: u64,

    /// Drain timer period (ms); defaults to the delay threshold
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,

    /// What happens to pending entries on shutdown
    #[serde(default)]
    pub shutdown_policy: ShutdownPolicy,
}

fn default_delay_threshold_ms() -> u64 {
    DEFAULT_DELAY_THRESHOLD_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay_threshold_ms: DEFAULT_DELAY_THRESHOLD_MS,
            tick_interval_ms: None,
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Config with the given threshold and a tick equal to it
    pub fn with_threshold(delay_threshold: Duration) -> Self {
        Self {
            delay_threshold_ms: delay_threshold.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn delay_threshold(&self) -> Duration {
        Duration::from_millis(self.delay_threshold_ms)
    }

    /// Effective drain timer period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.unwrap_or(self.delay_threshold_ms))
    }
}

/// Handling of entries still queued when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Keep firing until every pending entry has been dispatched
    #[default]
    Drain,
    /// Stop immediately and hand pending entries back to the caller
    Discard,
    /// Stop immediately and keep pending entries for on-demand draining
    Retain,
}

/// Peer session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session name
    pub id: String,

    /// Session transport
    #[serde(default)]
    pub kind: SessionKind,

    /// Remote contact (optional, informational)
    #[serde(default)]
    pub contact: Option<Contact>,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Session transport kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Log delivered messages
    #[default]
    Log,
    /// Send payloads as UDP datagrams
    Udp,
}
