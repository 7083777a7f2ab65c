//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Queue timestamps come from the dispatcher's monotonic clock
//! - `ControlMessage::sequence` is diagnostics only, never used for ordering

mod blueprint;
mod endpoint;
mod error;
mod message;
mod session;
mod session_id;

pub use blueprint::*;
pub use endpoint::*;
pub use error::*;
pub use message::ControlMessage;
pub use session::{PeerSession, SharedSession};
pub use session_id::SessionId;
