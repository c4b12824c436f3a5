//! Raw socket state transition records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// A single socket state change observed by the capture layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketTransition {
    /// Process that owns the socket
    pub pid: u32,
    /// Command name of the owning process
    pub comm: String,
    /// Transport protocol
    pub protocol: Protocol,
    /// Local address
    pub src_addr: IpAddr,
    /// Local port
    pub src_port: u16,
    /// Remote address (unspecified for listening sockets)
    pub dst_addr: IpAddr,
    /// Remote port (0 for listening sockets)
    pub dst_port: u16,
    /// State before the transition
    pub old_state: TcpState,
    /// State after the transition
    pub new_state: TcpState,
}

impl SocketTransition {
    /// True when the socket just started listening
    pub fn is_listen(&self) -> bool {
        self.old_state == TcpState::Close && self.new_state == TcpState::Listen
    }

    /// True when a listening socket was just closed
    pub fn is_unlisten(&self) -> bool {
        self.old_state == TcpState::Listen && self.new_state == TcpState::Close
    }
}

/// Transport protocol of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
}

impl Protocol {
    /// Protocol label
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel TCP socket states, numbered as in `include/net/tcp_states.h`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TcpState {
    /// Connection established
    Established,
    /// Active open, SYN sent
    SynSent,
    /// Passive open, SYN received
    SynRecv,
    /// Active close started
    FinWait1,
    /// Waiting for peer FIN
    FinWait2,
    /// Waiting for stray segments to expire
    TimeWait,
    /// Closed
    Close,
    /// Peer closed, waiting for local close
    CloseWait,
    /// Waiting for final ACK
    LastAck,
    /// Accepting connections
    Listen,
    /// Simultaneous close
    Closing,
    /// Request socket for a pending connection
    NewSynRecv,
}

impl TcpState {
    /// Map the kernel's numeric state to a variant
    pub fn from_kernel(value: u8) -> Option<Self> {
        let state = match value {
            1 => TcpState::Established,
            2 => TcpState::SynSent,
            3 => TcpState::SynRecv,
            4 => TcpState::FinWait1,
            5 => TcpState::FinWait2,
            6 => TcpState::TimeWait,
            7 => TcpState::Close,
            8 => TcpState::CloseWait,
            9 => TcpState::LastAck,
            10 => TcpState::Listen,
            11 => TcpState::Closing,
            12 => TcpState::NewSynRecv,
            _ => return None,
        };
        Some(state)
    }

    /// State label as reported in metric events
    pub fn as_str(&self) -> &'static str {
        match self {
            TcpState::Established => "ESTABLISHED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynRecv => "SYN_RECV",
            TcpState::FinWait1 => "FIN_WAIT1",
            TcpState::FinWait2 => "FIN_WAIT2",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::Close => "CLOSE",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::LastAck => "LAST_ACK",
            TcpState::Listen => "LISTEN",
            TcpState::Closing => "CLOSING",
            TcpState::NewSynRecv => "NEW_SYN_RECV",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
