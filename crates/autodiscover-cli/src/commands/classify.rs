//! `classify`: print discovery events without building configs

use super::{load_config, print_json};
use anyhow::{Context, Result};
use socket_autodiscover::{MemoryBus, SocketProvider};
use socket_monitor::ReplayMonitor;
use std::path::Path;
use std::sync::Arc;

pub async fn run(config: Option<&Path>, replay: &Path) -> Result<()> {
    let config = load_config(config).await?;

    let bus = Arc::new(MemoryBus::new("classify"));
    let events = bus.subscribe(&[]);

    let monitor = ReplayMonitor::from_file(replay).with_capacity(config.provider.channel_capacity);
    let provider = SocketProvider::new(Box::new(monitor), bus.clone());
    let watch = provider
        .start()
        .await
        .context("Failed to start socket provider")?;

    let feeder = smol::spawn(async move {
        watch.run().await;
        bus.close();
    });

    while let Ok(event) = events.recv().await {
        print_json(&event)?;
    }
    feeder.await;
    Ok(())
}
