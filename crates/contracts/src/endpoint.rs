//! Endpoint and contact records attached to peer sessions
//!
//! Passive data: the dispatch queue only carries these for log context.

use serde::{Deserialize, Serialize};
use std::fmt;

// ----------------------------------------------------------------------------
// Capability Flags
// ----------------------------------------------------------------------------

/// Legacy client capability bit-flags advertised by an endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const MOBILE_ONLINE: Self = Self(0x0000_0001);
    pub const INK_GIF: Self = Self(0x0000_0004);
    pub const INK_ISF: Self = Self(0x0000_0008);
    pub const WEBCAM: Self = Self(0x0000_0010);
    pub const MULTI_PACKET: Self = Self(0x0000_0020);
    pub const DIRECT_IM: Self = Self(0x0000_4000);
    pub const WINKS: Self = Self(0x0000_8000);
    pub const P2P_AWARE: Self = Self(0x0008_0000);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Extended capability bit-flags (second capability word)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtendedCapabilities(u32);

impl ExtendedCapabilities {
    pub const NONE: Self = Self(0);
    pub const RTC_VIDEO: Self = Self(0x0000_0010);
    pub const P2P_V2: Self = Self(0x0000_0020);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for ExtendedCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Endpoint / Contact
// ----------------------------------------------------------------------------

/// A reachable peer endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint identifier (account or machine id)
    pub id: String,

    /// Legacy capability flags
    #[serde(default)]
    pub capabilities: Capabilities,

    /// Extended capability flags
    #[serde(default)]
    pub extended_capabilities: ExtendedCapabilities,
}

impl Endpoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: Capabilities::NONE,
            extended_capabilities: ExtendedCapabilities::NONE,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_extended_capabilities(mut self, extended: ExtendedCapabilities) -> Self {
        self.extended_capabilities = extended;
        self
    }
}

/// Presence state of a contact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    #[default]
    Offline,
    Online,
    Busy,
    Away,
    BeRightBack,
    OnThePhone,
    OutToLunch,
    Hidden,
}

/// Endpoint of a contact on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub endpoint: Endpoint,

    /// Human-readable name
    #[serde(default)]
    pub display_name: String,

    /// Client type string reported by the peer
    #[serde(default)]
    pub client_type: String,

    /// Peer reports itself idle
    #[serde(default)]
    pub idle: bool,

    #[serde(default)]
    pub presence: PresenceState,
}

impl Contact {
    pub fn is_reachable(&self) -> bool {
        !matches!(self.presence, PresenceState::Offline | PresenceState::Hidden)
    }
}
