//! Catalog of known monitoring modules and their metric sets

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Read-only view of the modules a monitoring agent knows about
pub trait ModuleCatalog: Send + Sync {
    /// Metric sets enabled by default for `module`
    fn default_metricsets(&self, module: &str) -> Result<Vec<String>>;

    /// Every metric set `module` supports; empty if the module is unknown
    fn metricsets(&self, module: &str) -> Vec<String>;

    /// All module names, in catalog order
    fn modules(&self) -> Vec<String>;
}

/// Metric sets of one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// All supported metric sets
    #[serde(default)]
    pub metricsets: Vec<String>,
    /// Metric sets enabled when none are requested
    #[serde(default)]
    pub default_metricsets: Vec<String>,
}

impl ModuleDefinition {
    /// Create a definition where every metric set is a default
    pub fn with_defaults<S: Into<String>>(metricsets: impl IntoIterator<Item = S>) -> Self {
        let metricsets: Vec<String> = metricsets.into_iter().map(Into::into).collect();
        Self {
            default_metricsets: metricsets.clone(),
            metricsets,
        }
    }
}

/// A catalog held in memory, iterated in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    modules: IndexMap<String, ModuleDefinition>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module
    pub fn with_module(mut self, name: impl Into<String>, definition: ModuleDefinition) -> Self {
        self.modules.insert(name.into(), definition);
        self
    }

    /// Load a catalog from a YAML or JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let catalog: Self = crate::config::load_document(path).await?;
        catalog.validate()?;
        info!("Loaded {} modules from {:?}", catalog.modules.len(), path);
        Ok(catalog)
    }

    /// Parse a catalog from YAML
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module definition
    pub fn get(&self, module: &str) -> Option<&ModuleDefinition> {
        self.modules.get(module)
    }

    /// Check that module names are non-empty and defaults are supported metric sets
    pub fn validate(&self) -> Result<()> {
        for (name, definition) in &self.modules {
            if name.trim().is_empty() {
                return Err(Error::InvalidCatalog(
                    "module name cannot be empty".to_string(),
                ));
            }
            if let Some(unknown) = definition
                .default_metricsets
                .iter()
                .find(|m| !definition.metricsets.contains(*m))
            {
                return Err(Error::InvalidCatalog(format!(
                    "default metricset '{}' is not a metricset of module '{}'",
                    unknown, name
                )));
            }
        }
        Ok(())
    }
}

impl ModuleCatalog for StaticCatalog {
    fn default_metricsets(&self, module: &str) -> Result<Vec<String>> {
        self.modules
            .get(module)
            .map(|definition| definition.default_metricsets.clone())
            .ok_or_else(|| Error::UnknownModule(module.to_string()))
    }

    fn metricsets(&self, module: &str) -> Vec<String> {
        self.modules
            .get(module)
            .map(|definition| definition.metricsets.clone())
            .unwrap_or_default()
    }

    fn modules(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }
}
