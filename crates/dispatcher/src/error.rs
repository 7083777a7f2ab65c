//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Scheduler configuration rejected at build time
    #[error("invalid scheduler config '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// On-demand draining requested while the timer still owns the queue
    #[error("drain timer is still running; shut the dispatcher down first")]
    TimerRunning,

    /// Shutdown requested twice
    #[error("dispatcher already stopped")]
    AlreadyStopped,

    /// Timer task panicked or was cancelled
    #[error("drain timer task failed: {0}")]
    TimerTask(#[from] tokio::task::JoinError),

    /// Session creation error
    #[error("failed to create session '{name}': {message}")]
    SessionCreation { name: String, message: String },

    /// Contract-level error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a session creation error
    pub fn session_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SessionCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
