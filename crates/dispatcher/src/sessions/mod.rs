//! Built-in peer sessions
//!
//! Contains LogSession, ChannelSession, and UdpSession.

mod channel;
mod log;
mod udp;

use std::sync::Arc;

use contracts::{ControlMessage, SessionConfig, SessionKind, SharedSession};
use tracing::{debug, instrument};

use crate::error::DispatcherError;

pub use self::channel::{ChannelSession, Delivery};
pub use self::log::LogSession;
pub use self::udp::{UdpSession, UdpSessionConfig};

/// Create a session from its configuration
#[instrument(name = "create_session", skip(config), fields(session = %config.id))]
pub async fn create_session(
    config: &SessionConfig,
) -> Result<SharedSession<ControlMessage>, DispatcherError> {
    let endpoint = config.contact.as_ref().map(|c| c.endpoint.clone());

    let session: SharedSession<ControlMessage> = match config.kind {
        SessionKind::Log => {
            let mut session = LogSession::new(config.id.as_str());
            if let Some(endpoint) = endpoint {
                session = session.with_endpoint(endpoint);
            }
            Arc::new(session)
        }
        SessionKind::Udp => {
            let mut session = UdpSession::from_params(config.id.as_str(), &config.params).await?;
            if let Some(endpoint) = endpoint {
                session = session.with_endpoint(endpoint);
            }
            Arc::new(session)
        }
    };

    debug!(kind = ?config.kind, "Session created");
    Ok(session)
}

/// Create every configured session, in order
pub async fn create_sessions(
    configs: &[SessionConfig],
) -> Result<Vec<SharedSession<ControlMessage>>, DispatcherError> {
    let mut sessions = Vec::with_capacity(configs.len());
    for config in configs {
        sessions.push(create_session(config).await?);
    }
    Ok(sessions)
}
