//! Simulated workload orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig, Workload};
pub use stats::{RunStats, StopReason};
