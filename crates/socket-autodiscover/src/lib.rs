//! Socket-driven service autodiscovery
//!
//! Watches socket state transitions and reports services that start or
//! stop listening, then synthesizes monitoring configurations for them.
//!
//! # Architecture
//!
//! - [`SocketProvider`] reads a [`socket_monitor::Monitor`], keeps only
//!   CLOSE→LISTEN and LISTEN→CLOSE transitions and publishes them as flat
//!   discovery events on a [`Bus`].
//! - [`Autodiscover`] subscribes to the bus and asks its [`Builders`] for
//!   configurations, pairing each `stop` with the `start` of the same id.
//! - [`ModuleBuilder`] maps the process command name onto a module of a
//!   [`ModuleCatalog`] and applies an optional [`ConfigTemplate`].
//! - [`SocketCollector`] independently reports every transition as a
//!   metric event.
//!
//! Collaborators are injected; nothing is registered globally. Long-running
//! loops are plain futures, so callers spawn them on any runtime.
//!
//! # Example
//!
//! ```no_run
//! use socket_autodiscover::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> socket_autodiscover::Result<()> {
//! let bus = Arc::new(MemoryBus::new("autodiscover"));
//! let catalog = Arc::new(StaticCatalog::from_file("modules.yml").await?);
//! let builders = Arc::new(Builders::new().with(ModuleBuilder::new(catalog)));
//!
//! let (runner, changes) = Autodiscover::new(&bus, builders);
//! let provider = SocketProvider::new(
//!     Box::new(ReplayMonitor::from_file("capture.jsonl")),
//!     bus.clone(),
//! );
//!
//! let watch = provider.start().await?;
//! smol::spawn(runner.run()).detach();
//! smol::spawn(watch.run()).detach();
//!
//! while let Ok(change) = changes.recv().await {
//!     println!("{:?}", change);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod bus;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod provider;
pub mod runner;
pub mod template;

pub use builder::{Builder, Builders, MatchStrategy, ModuleBuilder, ModuleConfig};
pub use bus::{Bus, BusEvent, MemoryBus};
pub use catalog::{ModuleCatalog, ModuleDefinition, StaticCatalog};
pub use collector::{ChannelReporter, MetricEvent, Reporter, SocketCollector};
pub use config::{AutodiscoverConfig, BuilderConfig, ProviderConfig};
pub use error::{Error, Result};
pub use event::{Direction, DiscoveryEvent};
pub use provider::{SocketProvider, WatchSummary, WatchTask, classify};
pub use runner::{Autodiscover, ConfigChange};
pub use template::{ConfigTemplate, TemplateConfig, TemplateMapper};

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        Autodiscover, Builders, Bus, ConfigChange, Error, MemoryBus, ModuleBuilder, ModuleCatalog,
        Result, SocketProvider, StaticCatalog,
    };
    pub use socket_monitor::{Monitor, ReplayMonitor, ShutdownSignal};
}
