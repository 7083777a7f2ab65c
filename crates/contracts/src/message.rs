//! ControlMessage - payload handed to a peer session
//!
//! The dispatch queue never looks inside a message; this type exists so the
//! built-in sessions and the CLI have a concrete payload to move around.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Peer-to-peer control message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Sender-assigned sequence number (diagnostics only)
    pub sequence: u64,

    /// Content type of the payload (e.g. "application/x-p2p-invite")
    pub content_type: String,

    /// Raw payload (zero-copy)
    pub payload: Bytes,
}

impl ControlMessage {
    /// Create a new message
    pub fn new(sequence: u64, content_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_shared_on_clone() {
        let msg = ControlMessage::new(7, "text/x-invite", Bytes::from_static(b"INVITE"));
        let copy = msg.clone();
        assert_eq!(msg.payload.as_ptr(), copy.payload.as_ptr());
        assert_eq!(copy.len(), 6);
    }

    #[test]
    fn test_json_shape() {
        let msg = ControlMessage::new(1, "text/x-ack", Bytes::from_static(b"ok"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["content_type"], "text/x-ack");
    }
}
