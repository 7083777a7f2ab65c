//! LogSession - logs delivered messages via tracing

use std::fmt;

use contracts::{ContractError, Endpoint, PeerSession, SessionId};
use tracing::{info, instrument};

/// Session that only logs what it is asked to send
pub struct LogSession {
    id: SessionId,
    endpoint: Option<Endpoint>,
}

impl LogSession {
    /// Create a new LogSession with the given id
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl<M: fmt::Debug> PeerSession<M> for LogSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    #[instrument(name = "log_session_send", skip(self, message), fields(session = %self.id))]
    fn send(&self, message: M) -> Result<(), ContractError> {
        info!(
            session = %self.id,
            endpoint = self.endpoint.as_ref().map(|e| e.id.as_str()),
            message = ?message,
            "Control message delivered"
        );
        Ok(())
    }
}
