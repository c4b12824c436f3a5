//! Command implementations

pub mod classify;
pub mod collect;
pub mod discover;
pub mod modules;

use anyhow::{Context, Result};
use serde::Serialize;
use socket_autodiscover::AutodiscoverConfig;
use std::io::Write;
use std::path::Path;

/// Load the configuration file, or defaults when none was given
pub async fn load_config(path: Option<&Path>) -> Result<AutodiscoverConfig> {
    match path {
        Some(path) => AutodiscoverConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AutodiscoverConfig::default()),
    }
}

/// Write one value as a JSON line on stdout
pub fn print_json(value: &impl Serialize) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
}
