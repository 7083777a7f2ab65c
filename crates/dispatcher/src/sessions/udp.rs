//! UdpSession - one datagram per control message

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use contracts::{ContractError, ControlMessage, Endpoint, PeerSession, SessionId};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use crate::error::DispatcherError;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Configuration for UdpSession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpSessionConfig {
    /// Peer address
    pub addr: SocketAddr,
    /// Local bind address; unspecified address of the peer's family if absent
    pub bind: Option<SocketAddr>,
    /// Payloads above this size are rejected
    pub max_datagram_size: usize,
}

impl UdpSessionConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let bind = params
            .get("bind")
            .map(|s| {
                s.parse::<SocketAddr>()
                    .map_err(|e| format!("invalid bind address '{}': {}", s, e))
            })
            .transpose()?;

        let max_datagram_size = match params.get("max_datagram_size") {
            Some(s) => s
                .parse::<usize>()
                .map_err(|e| format!("invalid max_datagram_size '{}': {}", s, e))?
                .min(MAX_UDP_PAYLOAD),
            None => MAX_UDP_PAYLOAD,
        };

        Ok(Self {
            addr,
            bind,
            max_datagram_size,
        })
    }

    fn bind_addr(&self) -> SocketAddr {
        self.bind.unwrap_or_else(|| match self.addr {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        })
    }
}

/// Session that sends each payload as a single UDP datagram
///
/// Sends go through `try_send`: a send that would block is reported as a
/// failure instead of stalling the drain pass.
pub struct UdpSession {
    id: SessionId,
    endpoint: Option<Endpoint>,
    config: UdpSessionConfig,
    socket: UdpSocket,
}

impl UdpSession {
    /// Bind and connect a new UdpSession
    #[instrument(name = "udp_session_new", skip(id, config), fields(target = %config.addr))]
    pub async fn new(id: impl Into<SessionId>, config: UdpSessionConfig) -> std::io::Result<Self> {
        let id = id.into();
        let socket = UdpSocket::bind(config.bind_addr()).await?;
        socket.connect(config.addr).await?;

        debug!(session = %id, target = %config.addr, "UdpSession connected");

        Ok(Self {
            id,
            endpoint: None,
            config,
            socket,
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "udp_session_from_params", skip(id, params))]
    pub async fn from_params(
        id: impl Into<SessionId>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let id = id.into();
        let config = UdpSessionConfig::from_params(params)
            .map_err(|e| DispatcherError::session_creation(id.as_str(), e))?;
        Self::new(id.clone(), config)
            .await
            .map_err(|e| DispatcherError::session_creation(id.as_str(), e.to_string()))
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn config(&self) -> &UdpSessionConfig {
        &self.config
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl PeerSession<ControlMessage> for UdpSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    fn send(&self, message: ControlMessage) -> Result<(), ContractError> {
        if message.len() > self.config.max_datagram_size {
            return Err(ContractError::session_send(
                self.id.as_str(),
                format!(
                    "payload of {} bytes exceeds datagram limit {}",
                    message.len(),
                    self.config.max_datagram_size
                ),
            ));
        }

        match self.socket.try_send(&message.payload) {
            Ok(sent) => {
                debug!(session = %self.id, sequence = message.sequence, bytes = sent, "Sent");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(ContractError::session_send(
                self.id.as_str(),
                "socket send buffer full",
            )),
            Err(e) => Err(ContractError::session_send(self.id.as_str(), e.to_string())),
        }
    }
}
