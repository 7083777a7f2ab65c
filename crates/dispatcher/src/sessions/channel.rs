//! ChannelSession - forwards deliveries into a tokio channel

use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, Endpoint, PeerSession, SessionId};
use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};

/// One message handed to a [`ChannelSession`]
#[derive(Debug, Clone)]
pub struct Delivery<M> {
    pub session: SessionId,
    pub message: M,
    /// Clock reading at the moment of the send
    pub delivered_at: Instant,
}

/// Session whose "network" is an unbounded mpsc channel
///
/// Used to observe what the dispatcher sends and when. Several sessions may
/// share one sender so a single receiver sees the global delivery order.
pub struct ChannelSession<M> {
    id: SessionId,
    endpoint: Option<Endpoint>,
    tx: mpsc::UnboundedSender<Delivery<M>>,
    clock: Arc<dyn Clock>,
}

impl<M> ChannelSession<M> {
    /// Create a session and its receiver, stamping with the system clock
    pub fn new(id: impl Into<SessionId>) -> (Self, mpsc::UnboundedReceiver<Delivery<M>>) {
        Self::with_clock(id, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        id: impl Into<SessionId>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<Delivery<M>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::from_sender(id, tx, clock), rx)
    }

    /// Create a session feeding an existing channel
    pub fn from_sender(
        id: impl Into<SessionId>,
        tx: mpsc::UnboundedSender<Delivery<M>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: id.into(),
            endpoint: None,
            tx,
            clock,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl<M: Send> PeerSession<M> for ChannelSession<M> {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    fn send(&self, message: M) -> Result<(), ContractError> {
        let delivery = Delivery {
            session: self.id.clone(),
            message,
            delivered_at: self.clock.now(),
        };
        self.tx
            .send(delivery)
            .map_err(|_| ContractError::session_closed(self.id.as_str()))
    }
}
