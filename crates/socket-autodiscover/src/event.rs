//! Discovery events published when a service starts or stops listening

use crate::bus::BusEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use socket_monitor::SocketTransition;
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// Keys of a discovery event on the bus
pub mod keys {
    /// Identity of the provider that published the event
    pub const PROVIDER: &str = "provider";
    /// Correlation id shared by the start and stop of one socket
    pub const ID: &str = "id";
    /// Listening address
    pub const HOST: &str = "host";
    /// Listening port
    pub const PORT: &str = "port";
    /// Command name of the listening process
    pub const COMM: &str = "comm";
    /// Process id of the listening process
    pub const PID: &str = "pid";
    /// Set to `true` on service start
    pub const START: &str = "start";
    /// Set to `true` on service stop
    pub const STOP: &str = "stop";
    /// Configurations synthesized by the provider's builders
    pub const CONFIG: &str = "config";
}

/// Whether a service appeared or disappeared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The socket started listening
    Start,
    /// The listening socket was closed
    Stop,
}

impl Direction {
    /// Bus key flagging this direction
    pub fn key(&self) -> &'static str {
        match self {
            Direction::Start => keys::START,
            Direction::Stop => keys::STOP,
        }
    }

    /// Read the direction flag of a bus event
    pub fn of(event: &BusEvent) -> Option<Self> {
        let flagged = |key: &str| event.get(key).and_then(Value::as_bool).unwrap_or(false);
        if flagged(keys::START) {
            Some(Direction::Start)
        } else if flagged(keys::STOP) {
            Some(Direction::Stop)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A service start or stop derived from one socket transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryEvent {
    /// Provider instance that observed the transition
    pub provider: Uuid,
    /// `"<pid>:<port>"`
    pub id: String,
    /// Listening address
    pub host: IpAddr,
    /// Listening port
    pub port: u16,
    /// Command name of the owning process
    pub comm: String,
    /// Owning process
    pub pid: u32,
    /// Start or stop
    pub direction: Direction,
}

impl DiscoveryEvent {
    /// Correlation id for a listening socket
    pub fn event_id(pid: u32, port: u16) -> String {
        format!("{}:{}", pid, port)
    }

    /// Build the event for a classified transition
    pub fn from_transition(
        provider: Uuid,
        transition: &SocketTransition,
        direction: Direction,
    ) -> Self {
        Self {
            provider,
            id: Self::event_id(transition.pid, transition.src_port),
            host: transition.src_addr,
            port: transition.src_port,
            comm: transition.comm.clone(),
            pid: transition.pid,
            direction,
        }
    }

    /// Flatten into the bus representation
    pub fn to_bus_event(&self) -> BusEvent {
        let mut event = BusEvent::new();
        event.insert(keys::PROVIDER.into(), Value::String(self.provider.to_string()));
        event.insert(keys::ID.into(), Value::String(self.id.clone()));
        event.insert(keys::HOST.into(), Value::String(self.host.to_string()));
        event.insert(keys::PORT.into(), Value::from(self.port));
        event.insert(keys::COMM.into(), Value::String(self.comm.clone()));
        event.insert(keys::PID.into(), Value::from(self.pid));
        event.insert(self.direction.key().into(), Value::Bool(true));
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use socket_monitor::{Protocol, TcpState};
    use std::net::Ipv4Addr;

    #[test]
    fn test_bus_shape() {
        let provider = Uuid::new_v4();
        let transition = SocketTransition {
            pid: 42,
            comm: "nginx".to_string(),
            protocol: Protocol::Tcp,
            src_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            src_port: 8080,
            dst_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_port: 0,
            old_state: TcpState::Close,
            new_state: TcpState::Listen,
        };

        let event = DiscoveryEvent::from_transition(provider, &transition, Direction::Start)
            .to_bus_event();

        assert_eq!(
            Value::Object(event.clone()),
            json!({
                "provider": provider.to_string(),
                "id": "42:8080",
                "host": "127.0.0.1",
                "port": 8080,
                "comm": "nginx",
                "pid": 42,
                "start": true,
            })
        );
        assert_eq!(Direction::of(&event), Some(Direction::Start));
    }

    #[test]
    fn test_direction_flags() {
        let stop = json!({"stop": true});
        let neither = json!({"start": false});
        assert_eq!(Direction::of(stop.as_object().unwrap()), Some(Direction::Stop));
        assert_eq!(Direction::of(neither.as_object().unwrap()), None);
    }
}
