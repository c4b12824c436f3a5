//! `discover`: full pipeline over a recorded capture

use super::{load_config, print_json};
use anyhow::{Context, Result};
use socket_autodiscover::{
    Autodiscover, Builders, MemoryBus, ModuleBuilder, SocketProvider, StaticCatalog,
    TemplateMapper,
};
use socket_monitor::ReplayMonitor;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub async fn run(config: Option<&Path>, replay: &Path, catalog: &Path) -> Result<()> {
    let config = load_config(config).await?;
    let catalog = StaticCatalog::from_file(catalog)
        .await
        .with_context(|| format!("Failed to load catalog from {}", catalog.display()))?;

    let mut builder = ModuleBuilder::from_config(Arc::new(catalog), &config.builder);
    let mapper =
        TemplateMapper::new(config.templates.clone()).context("Invalid config templates")?;
    if !mapper.is_empty() {
        info!("Using {} config templates", mapper.len());
        builder = builder.with_template(Arc::new(mapper));
    }
    let builders = Arc::new(Builders::new().with(builder));

    let bus = Arc::new(MemoryBus::new("autodiscover"));
    let (runner, changes) = Autodiscover::new(&bus, builders);
    debug!("Autodiscover subscribed to bus {}", bus.name());

    let monitor = ReplayMonitor::from_file(replay).with_capacity(config.provider.channel_capacity);
    let provider = SocketProvider::new(Box::new(monitor), bus.clone());
    let watch = provider
        .start()
        .await
        .context("Failed to start socket provider")?;

    let runner = smol::spawn(runner.run());
    let feeder = smol::spawn(async move {
        let summary = watch.run().await;
        bus.close();
        summary
    });

    while let Ok(change) = changes.recv().await {
        print_json(&change)?;
    }

    runner.await;
    let summary = feeder.await;
    info!(
        "Processed {} transitions, published {} discovery events",
        summary.received, summary.published
    );
    Ok(())
}
