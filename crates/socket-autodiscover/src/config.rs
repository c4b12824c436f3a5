//! Configuration structures for socket autodiscovery

use crate::{builder::MatchStrategy, error::Result, template::TemplateConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level autodiscovery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutodiscoverConfig {
    /// Socket provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Module builder settings
    #[serde(default)]
    pub builder: BuilderConfig,
    /// Config templates applied to every synthesized configuration
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Socket provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Capacity of the queue between the monitor and the provider
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Module builder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Command names that never map to a service (e.g. port-forwarding proxies)
    #[serde(default = "default_ignore_commands")]
    pub ignore_commands: Vec<String>,
    /// How to pick a module when several catalog names match
    #[serde(default)]
    pub match_strategy: MatchStrategy,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            ignore_commands: default_ignore_commands(),
            match_strategy: MatchStrategy::default(),
        }
    }
}

fn default_channel_capacity() -> usize {
    socket_monitor::monitor::DEFAULT_CHANNEL_CAPACITY
}

fn default_ignore_commands() -> Vec<String> {
    vec!["docker-proxy".to_string()]
}

impl AutodiscoverConfig {
    /// Load configuration from file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_document(path).await
    }
}

/// Read a YAML (`.yaml`/`.yml`) or JSON document
pub(crate) async fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = async_fs::read_to_string(path).await?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
        _ => Ok(serde_json::from_str(&contents)?),
    }
}
