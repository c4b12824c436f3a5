//! Autodiscover runner
//!
//! Listens for discovery events on the bus and turns them into
//! [`ConfigChange`]s, pairing each `stop` with the configs launched by the
//! `start` that shares its id.

use crate::{
    builder::{Builders, ModuleConfig},
    bus::{BusEvent, MemoryBus},
    event::{Direction, keys},
};
use async_channel::{Receiver, Sender};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request to start or stop collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConfigChange {
    /// Launch these configurations
    Start {
        /// Discovery event id
        id: String,
        /// Configurations to launch
        configs: Vec<ModuleConfig>,
    },
    /// Stop the configurations launched for `id`
    Stop {
        /// Discovery event id
        id: String,
        /// Configurations to stop
        configs: Vec<ModuleConfig>,
    },
}

impl ConfigChange {
    /// Discovery event id the change belongs to
    pub fn id(&self) -> &str {
        match self {
            ConfigChange::Start { id, .. } | ConfigChange::Stop { id, .. } => id,
        }
    }
}

/// Bus subscriber correlating discovery events into config changes
pub struct Autodiscover {
    events: Receiver<BusEvent>,
    builders: Arc<Builders>,
    changes: Sender<ConfigChange>,
    running: HashMap<String, Vec<ModuleConfig>>,
}

impl Autodiscover {
    /// Subscribe to provider events on `bus`
    pub fn new(bus: &MemoryBus, builders: Arc<Builders>) -> (Self, Receiver<ConfigChange>) {
        Self::from_receiver(bus.subscribe(&[keys::PROVIDER]), builders)
    }

    /// Consume events from an existing subscription
    pub fn from_receiver(
        events: Receiver<BusEvent>,
        builders: Arc<Builders>,
    ) -> (Self, Receiver<ConfigChange>) {
        let (changes, rx) = async_channel::unbounded();
        let runner = Self {
            events,
            builders,
            changes,
            running: HashMap::new(),
        };
        (runner, rx)
    }

    /// Number of ids with launched configs
    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Process events until the subscription closes
    pub async fn run(mut self) {
        while let Ok(event) = self.events.recv().await {
            let Some(change) = self.handle(&event) else {
                continue;
            };
            if self.changes.send(change).await.is_err() {
                debug!("config change receiver dropped, stopping autodiscover");
                break;
            }
        }
        info!("autodiscover stopped with {} services running", self.running.len());
    }

    /// Apply one bus event, returning the change it causes
    pub fn handle(&mut self, event: &BusEvent) -> Option<ConfigChange> {
        let id = event.get(keys::ID).and_then(Value::as_str)?.to_string();

        match Direction::of(event)? {
            Direction::Start => {
                if self.running.contains_key(&id) {
                    debug!("{} already running, ignoring start", id);
                    return None;
                }
                let configs = self.configs_for(event);
                if configs.is_empty() {
                    debug!("no configs for {}", id);
                    return None;
                }
                info!("starting {} configs for {}", configs.len(), id);
                self.running.insert(id.clone(), configs.clone());
                Some(ConfigChange::Start { id, configs })
            }
            Direction::Stop => match self.running.remove(&id) {
                Some(configs) => {
                    info!("stopping {} configs for {}", configs.len(), id);
                    Some(ConfigChange::Stop { id, configs })
                }
                None => {
                    debug!("stop for {} without a running start", id);
                    None
                }
            },
        }
    }

    /// Configs attached by the provider, else built here
    fn configs_for(&self, event: &BusEvent) -> Vec<ModuleConfig> {
        if let Some(attached) = event.get(keys::CONFIG) {
            match serde_json::from_value::<Vec<ModuleConfig>>(attached.clone()) {
                Ok(configs) => return configs,
                Err(e) => warn!("ignoring malformed attached config: {}", e),
            }
        }
        self.builders.get_config(event)
    }
}
