//! Layered error definitions
//!
//! Categorized by source: config / session / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Session Errors =====
    /// Session failed to transmit a message
    #[error("session '{session}' send error: {message}")]
    SessionSend { session: String, message: String },

    /// Session is no longer able to send
    #[error("session '{session}' is closed")]
    SessionClosed { session: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create session send error
    pub fn session_send(session: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SessionSend {
            session: session.into(),
            message: message.into(),
        }
    }

    /// Create session closed error
    pub fn session_closed(session: impl Into<String>) -> Self {
        Self::SessionClosed {
            session: session.into(),
        }
    }
}
