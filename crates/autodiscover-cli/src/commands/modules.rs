//! `modules`: show a catalog

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use socket_autodiscover::{ModuleCatalog, StaticCatalog};
use std::path::Path;

pub async fn run(catalog: &Path) -> Result<()> {
    let catalog = StaticCatalog::from_file(catalog)
        .await
        .with_context(|| format!("Failed to load catalog from {}", catalog.display()))?;

    if catalog.is_empty() {
        println!("No modules in catalog");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Module", "Default metricsets", "Metricsets"]);

    for module in catalog.modules() {
        let Some(definition) = catalog.get(&module) else {
            continue;
        };
        table.add_row(vec![
            module.clone(),
            definition.default_metricsets.join(", "),
            definition.metricsets.join(", "),
        ]);
    }

    println!("{table}");
    Ok(())
}
