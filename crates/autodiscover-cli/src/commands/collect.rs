//! `collect`: every transition as a metric event

use super::print_json;
use anyhow::{Context, Result};
use socket_autodiscover::{ChannelReporter, SocketCollector};
use socket_monitor::ReplayMonitor;
use std::path::Path;
use tracing::info;

pub async fn run(replay: &Path) -> Result<()> {
    let collector = SocketCollector::new(Box::new(ReplayMonitor::from_file(replay)));
    let (reporter, events) = ChannelReporter::new();

    let task = smol::spawn(async move { collector.run(&reporter).await });

    while let Ok(event) = events.recv().await {
        print_json(&event)?;
    }

    let reported = task.await.context("Socket collector failed")?;
    info!("Collected {} socket transitions", reported);
    Ok(())
}
