//! Raw socket metrics collector
//!
//! Republishes every transition the monitor reports, unclassified, as a
//! metric event.

use crate::error::{Error, Result};
use async_channel::{Receiver, Sender};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use socket_monitor::{Monitor, ShutdownSignal, SocketTransition};
use tracing::{debug, info};

/// Name events are reported under
pub const METRICSET: &str = "socket.collector";

/// One collected transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEvent {
    /// When the transition was collected
    pub timestamp: DateTime<Utc>,
    /// Reporting metric set
    pub metricset: String,
    /// Transition fields
    pub fields: Map<String, Value>,
}

impl MetricEvent {
    /// Build the event for a transition
    pub fn from_transition(transition: &SocketTransition) -> Self {
        Self {
            timestamp: Utc::now(),
            metricset: METRICSET.to_string(),
            fields: metric_fields(transition),
        }
    }
}

/// Metric fields of a transition
pub fn metric_fields(transition: &SocketTransition) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("comm".into(), Value::String(transition.comm.clone()));
    fields.insert("protocol".into(), Value::String(transition.protocol.to_string()));
    fields.insert("source_addr".into(), Value::String(transition.src_addr.to_string()));
    fields.insert("source_port".into(), Value::from(transition.src_port));
    fields.insert(
        "destination_addr".into(),
        Value::String(transition.dst_addr.to_string()),
    );
    fields.insert("destination_port".into(), Value::from(transition.dst_port));
    fields.insert("old_state".into(), Value::String(transition.old_state.to_string()));
    fields.insert("new_state".into(), Value::String(transition.new_state.to_string()));
    fields
}

/// Sink for collected events
pub trait Reporter: Send + Sync {
    /// Signal that ends collection
    fn done(&self) -> ShutdownSignal;

    /// Report an event; `false` once the reporter no longer accepts events
    fn event(&self, event: MetricEvent) -> bool;
}

/// Reporter forwarding events into a channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<MetricEvent>,
    done: ShutdownSignal,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its events
    pub fn new() -> (Self, Receiver<MetricEvent>) {
        let (tx, rx) = async_channel::unbounded();
        let reporter = Self {
            tx,
            done: ShutdownSignal::new(),
        };
        (reporter, rx)
    }
}

impl Reporter for ChannelReporter {
    fn done(&self) -> ShutdownSignal {
        self.done.clone()
    }

    fn event(&self, event: MetricEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

/// Collects every socket transition from its own monitor
pub struct SocketCollector {
    monitor: Box<dyn Monitor>,
}

impl SocketCollector {
    /// Create a collector over `monitor`
    pub fn new(monitor: Box<dyn Monitor>) -> Self {
        Self { monitor }
    }

    /// Report transitions until the stream closes; returns the number reported
    ///
    /// Fails only if the monitor cannot be started.
    pub async fn run(&self, reporter: &dyn Reporter) -> Result<u64> {
        let transitions = self
            .monitor
            .start(reporter.done())
            .await
            .map_err(Error::MonitorStart)?;
        info!("socket collector started");

        let mut reported = 0;
        while let Ok(transition) = transitions.recv().await {
            if !reporter.event(MetricEvent::from_transition(&transition)) {
                debug!("reporter closed, stopping socket collector");
                break;
            }
            reported += 1;
        }

        debug!("socket collector reported {} events", reported);
        Ok(reported)
    }
}
