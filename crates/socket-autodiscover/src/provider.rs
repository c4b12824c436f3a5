//! Socket provider: classifies transitions and publishes discovery events
//!
//! Only two transitions matter: a socket moving from CLOSE to LISTEN (a
//! service started) and from LISTEN to CLOSE (it stopped). Everything else
//! the monitor reports is dropped.
//!
//! The provider does not spawn anything itself. [`SocketProvider::start`]
//! hands back a [`WatchTask`] that the caller runs on its runtime of choice.

use crate::{
    builder::Builders,
    bus::Bus,
    error::{Error, Result},
    event::{Direction, DiscoveryEvent, keys},
};
use async_channel::Receiver;
use socket_monitor::{Monitor, ShutdownSignal, SocketTransition};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Classify a transition as a service start or stop
pub fn classify(transition: &SocketTransition) -> Option<Direction> {
    if transition.is_listen() {
        Some(Direction::Start)
    } else if transition.is_unlisten() {
        Some(Direction::Stop)
    } else {
        None
    }
}

/// Discovery provider driven by socket state transitions
pub struct SocketProvider {
    id: Uuid,
    monitor: Box<dyn Monitor>,
    bus: Arc<dyn Bus>,
    builders: Option<Arc<Builders>>,
    done: ShutdownSignal,
}

impl SocketProvider {
    /// Create a provider publishing to `bus`
    pub fn new(monitor: Box<dyn Monitor>, bus: Arc<dyn Bus>) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor,
            bus,
            builders: None,
            done: ShutdownSignal::new(),
        }
    }

    /// Attach synthesized configurations to published events
    pub fn with_builders(mut self, builders: Arc<Builders>) -> Self {
        self.builders = Some(builders);
        self
    }

    /// Provider identity stamped on every event
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shutdown signal shared with the monitor
    pub fn done(&self) -> ShutdownSignal {
        self.done.clone()
    }

    /// Start the monitor and return the task consuming its stream
    ///
    /// A monitor that cannot start is fatal for the provider.
    pub async fn start(&self) -> Result<WatchTask> {
        let transitions = self
            .monitor
            .start(self.done.clone())
            .await
            .map_err(Error::MonitorStart)?;

        info!("socket provider {} started", self.id);
        Ok(WatchTask {
            provider: self.id,
            transitions,
            bus: self.bus.clone(),
            builders: self.builders.clone(),
        })
    }

    /// Stop the monitor; the watch task ends once the stream drains
    pub fn stop(&self) {
        debug!("stopping socket provider {}", self.id);
        self.done.trigger();
    }
}

impl fmt::Display for SocketProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("socket")
    }
}

/// Counters reported when a watch task ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Transitions read from the monitor
    pub received: u64,
    /// Discovery events published
    pub published: u64,
}

/// The loop reading the monitor's stream
pub struct WatchTask {
    provider: Uuid,
    transitions: Receiver<SocketTransition>,
    bus: Arc<dyn Bus>,
    builders: Option<Arc<Builders>>,
}

impl WatchTask {
    /// Consume transitions until the monitor closes its stream
    pub async fn run(self) -> WatchSummary {
        let mut summary = WatchSummary::default();

        while let Ok(transition) = self.transitions.recv().await {
            summary.received += 1;
            if self.handle(&transition).is_some() {
                summary.published += 1;
            }
        }

        debug!(
            "socket stream closed after {} transitions, {} events published",
            summary.received, summary.published
        );
        summary
    }

    /// Classify one transition and publish the resulting event, if any
    pub fn handle(&self, transition: &SocketTransition) -> Option<DiscoveryEvent> {
        let direction = classify(transition)?;
        let event = DiscoveryEvent::from_transition(self.provider, transition, direction);
        debug!("{} {} ({})", direction, event.id, event.comm);
        self.publish(&event);
        Some(event)
    }

    fn publish(&self, event: &DiscoveryEvent) {
        let mut bus_event = event.to_bus_event();

        if let Some(builders) = &self.builders {
            let configs = builders.get_config(&bus_event);
            if !configs.is_empty() {
                match serde_json::to_value(&configs) {
                    Ok(configs) => {
                        bus_event.insert(keys::CONFIG.into(), configs);
                    }
                    Err(e) => warn!("unable to attach configs to event {}: {}", event.id, e),
                }
            }
        }

        self.bus.publish(bus_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket_monitor::{Protocol, TcpState};
    use std::net::{IpAddr, Ipv4Addr};

    fn transition(old_state: TcpState, new_state: TcpState) -> SocketTransition {
        SocketTransition {
            pid: 42,
            comm: "nginx".to_string(),
            protocol: Protocol::Tcp,
            src_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            src_port: 8080,
            dst_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_port: 0,
            old_state,
            new_state,
        }
    }

    #[test]
    fn test_classification() {
        use TcpState::*;

        assert_eq!(classify(&transition(Close, Listen)), Some(Direction::Start));
        assert_eq!(classify(&transition(Listen, Close)), Some(Direction::Stop));

        for (old, new) in [
            (Established, Close),
            (Established, CloseWait),
            (SynSent, Established),
            (Listen, Listen),
            (Close, Close),
            (Listen, Established),
            (TimeWait, Close),
        ] {
            assert_eq!(classify(&transition(old, new)), None, "{} -> {}", old, new);
        }
    }
}
