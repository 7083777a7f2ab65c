//! PeerSession trait - the dispatch queue's only outbound interface
//!
//! A session is a send-capable peer-to-peer context. The queue holds sessions
//! as shared trait objects and calls `send` once per due entry.

use std::sync::Arc;

use crate::{ContractError, Endpoint, SessionId};

/// Shared handle to a session, as stored in queue entries
pub type SharedSession<M> = Arc<dyn PeerSession<M>>;

/// Send-capable peer session
///
/// `send` is called from the dispatcher's timer task, outside the queue
/// lock. Implementations should hand the message to their transport and
/// return promptly; transport failures are reported through the `Result`
/// and are the session's own concern.
///
/// # Example
///
/// ```ignore
/// struct Loopback { id: SessionId }
///
/// impl PeerSession<ControlMessage> for Loopback {
///     fn id(&self) -> &SessionId { &self.id }
///     fn send(&self, message: ControlMessage) -> Result<(), ContractError> {
///         println!("{} <- {}", self.id, message.sequence);
///         Ok(())
///     }
/// }
/// ```
pub trait PeerSession<M>: Send + Sync {
    /// Session identifier (used for logging/metrics)
    fn id(&self) -> &SessionId;

    /// Remote endpoint this session talks to, if known
    ///
    /// Carried as an opaque attribute; the queue only logs it.
    fn endpoint(&self) -> Option<&Endpoint> {
        None
    }

    /// Transmit a message to the peer
    ///
    /// # Errors
    /// Returns the transport failure (should include context)
    fn send(&self, message: M) -> Result<(), ContractError>;
}
