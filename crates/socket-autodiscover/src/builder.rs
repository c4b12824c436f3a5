//! Monitoring configuration builders
//!
//! A [`Builder`] turns a discovery event into zero or more
//! [`ModuleConfig`]s. [`ModuleBuilder`] infers the module from the listening
//! process's command name by looking it up in a [`ModuleCatalog`].

use crate::{
    bus::BusEvent,
    catalog::ModuleCatalog,
    config::BuilderConfig,
    event::keys,
    template::ConfigTemplate,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// A monitoring configuration for one discovered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module to run
    pub module: String,
    /// Metric sets to collect
    pub metricsets: Vec<String>,
    /// Targets, as `host:port`
    pub hosts: Vec<String>,
    /// Whether collection is enabled
    pub enabled: bool,
    /// Fields attached to every collected event
    pub fields: ConfigFields,
    /// Whether `fields` are placed at the event root
    pub fields_under_root: bool,
    /// Additional settings contributed by templates
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields attached to collected events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFields {
    /// Process that owns the monitored socket
    pub process: ProcessFields,
    /// Additional fields contributed by templates
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Process identity fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessFields {
    /// Process id
    pub pid: Option<u32>,
}

/// Synthesizes configurations from discovery events
pub trait Builder: Send + Sync {
    /// Builder name, for logging
    fn name(&self) -> &str;

    /// Configurations for `event`; empty when the event is not a service
    fn create_config(&self, event: &BusEvent) -> Vec<ModuleConfig>;
}

/// An ordered set of builders whose outputs are concatenated
#[derive(Default)]
pub struct Builders {
    builders: Vec<Box<dyn Builder>>,
}

impl Builders {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a builder
    pub fn with(mut self, builder: impl Builder + 'static) -> Self {
        self.builders.push(Box::new(builder));
        self
    }

    /// Collect configurations from every builder
    pub fn get_config(&self, event: &BusEvent) -> Vec<ModuleConfig> {
        self.builders
            .iter()
            .flat_map(|builder| {
                let configs = builder.create_config(event);
                debug!("builder {} produced {} configs", builder.name(), configs.len());
                configs
            })
            .collect()
    }
}

/// How to resolve a command name that contains several module names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// First matching module in catalog order
    First,
    /// Longest matching module name; ties go to catalog order
    #[default]
    Longest,
}

/// Builder matching command names against catalog modules
pub struct ModuleBuilder {
    catalog: Arc<dyn ModuleCatalog>,
    ignore_commands: Vec<String>,
    strategy: MatchStrategy,
    template: Option<Arc<dyn ConfigTemplate>>,
}

impl ModuleBuilder {
    /// Create a builder with default settings
    pub fn new(catalog: Arc<dyn ModuleCatalog>) -> Self {
        Self::from_config(catalog, &BuilderConfig::default())
    }

    /// Create a builder from configuration
    pub fn from_config(catalog: Arc<dyn ModuleCatalog>, config: &BuilderConfig) -> Self {
        Self {
            catalog,
            ignore_commands: config.ignore_commands.clone(),
            strategy: config.match_strategy,
            template: None,
        }
    }

    /// Apply `template` to every built configuration
    pub fn with_template(mut self, template: Arc<dyn ConfigTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    /// Pick the catalog module a command name refers to
    ///
    /// Falls back to the command name itself when no module name is a
    /// substring of it.
    pub fn resolve_module(&self, comm: &str) -> String {
        let modules = self.catalog.modules();
        let mut best: Option<&String> = None;

        for module in modules.iter().filter(|m| !m.is_empty() && comm.contains(m.as_str())) {
            match self.strategy {
                MatchStrategy::First => {
                    best = Some(module);
                    break;
                }
                MatchStrategy::Longest => {
                    if best.is_none_or(|current| module.len() > current.len()) {
                        best = Some(module);
                    }
                }
            }
        }

        match best {
            Some(module) => module.clone(),
            None => {
                debug!("no catalog module matches command {}", comm);
                comm.to_string()
            }
        }
    }

    /// Default metric sets of `module`, or all of them when it has no defaults
    pub fn metricsets(&self, module: &str) -> Vec<String> {
        match self.catalog.default_metricsets(module) {
            Ok(defaults) if !defaults.is_empty() => defaults,
            Ok(_) => self.catalog.metricsets(module),
            Err(e) => {
                debug!("default metricset lookup failed: {}", e);
                self.catalog.metricsets(module)
            }
        }
    }

    fn build(&self, event: &BusEvent) -> Option<ModuleConfig> {
        let comm = event
            .get(keys::COMM)
            .and_then(Value::as_str)
            .filter(|comm| !comm.is_empty())?;
        let host = event.get(keys::HOST).and_then(host_of)?;
        let port = event.get(keys::PORT).and_then(port_of)?;

        if self.ignore_commands.iter().any(|ignored| ignored == comm) {
            debug!("ignoring command {}", comm);
            return None;
        }

        let module = self.resolve_module(comm);
        let metricsets = self.metricsets(&module);
        let pid = event
            .get(keys::PID)
            .and_then(Value::as_u64)
            .and_then(|pid| u32::try_from(pid).ok());

        Some(ModuleConfig {
            module,
            metricsets,
            hosts: vec![target(&host, port)],
            enabled: true,
            fields: ConfigFields {
                process: ProcessFields { pid },
                extra: Map::new(),
            },
            fields_under_root: true,
            extra: Map::new(),
        })
    }
}

impl Builder for ModuleBuilder {
    fn name(&self) -> &str {
        "module"
    }

    fn create_config(&self, event: &BusEvent) -> Vec<ModuleConfig> {
        let Some(config) = self.build(event) else {
            return Vec::new();
        };

        match serde_json::to_string(&config) {
            Ok(encoded) => debug!("generated config: {}", encoded),
            Err(e) => {
                warn!("unable to encode config for module {}: {}", config.module, e);
                return Vec::new();
            }
        }

        let configs = vec![config];
        match &self.template {
            Some(template) => template.apply(event, configs),
            None => configs,
        }
    }
}

fn host_of(value: &Value) -> Option<String> {
    match value {
        Value::String(host) if !host.is_empty() => Some(host.clone()),
        _ => None,
    }
}

fn port_of(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `host:port`, bracketing IPv6 literals
fn target(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{}]:{}", v6, port),
        _ => format!("{}:{}", host, port),
    }
}
