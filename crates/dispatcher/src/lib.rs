//! # Dispatcher
//!
//! 延迟派发模块。
//!
//! 负责：
//! - 接收 (session, message) 并记录入队时间
//! - 周期性地按 FIFO 顺序派发已满延迟阈值的条目
//! - 隔离单个 session 的发送失败，不影响后续派发

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod queue;
pub mod sessions;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contracts::{ControlMessage, PeerSession, SchedulerConfig, SharedSession, ShutdownPolicy};
pub use dispatcher::{DelayedDispatcher, DispatcherBuilder, DrainReport, ShutdownReport};
pub use error::DispatcherError;
pub use handle::{DispatchHandle, EnqueueOutcome, IgnoreReason};
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use queue::{PendingQueue, QueueEntry};
pub use sessions::{
    ChannelSession, Delivery, LogSession, UdpSession, UdpSessionConfig, create_session,
    create_sessions,
};
