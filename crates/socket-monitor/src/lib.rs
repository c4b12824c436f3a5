//! Socket state transition capture interface
//!
//! This crate defines the records a kernel-level socket capture layer hands
//! to userspace, the [`Monitor`] trait such a layer implements, and a
//! [`ReplayMonitor`] that plays back recorded transitions.
//!
//! Monitors are runtime-agnostic: they hand back an `async-channel`
//! receiver and stop producing once the shared [`ShutdownSignal`] fires.
//!
//! # Example
//!
//! ```no_run
//! use socket_monitor::{Monitor, ReplayMonitor, ShutdownSignal};
//!
//! # async fn example() -> socket_monitor::Result<()> {
//! let monitor = ReplayMonitor::from_file("capture.jsonl");
//! let done = ShutdownSignal::new();
//! let transitions = monitor.start(done.clone()).await?;
//!
//! while let Ok(transition) = transitions.recv().await {
//!     println!("{} {} -> {}", transition.comm, transition.old_state, transition.new_state);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod monitor;
pub mod replay;
pub mod shutdown;
pub mod transition;

pub use error::{Error, Result};
pub use monitor::Monitor;
pub use replay::ReplayMonitor;
pub use shutdown::ShutdownSignal;
pub use transition::{Protocol, SocketTransition, TcpState};
