//! The monitor interface implemented by socket capture layers

use crate::{error::Result, shutdown::ShutdownSignal, transition::SocketTransition};
use async_channel::Receiver;
use async_trait::async_trait;

/// Default capacity of a monitor's output channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A source of socket state transitions
///
/// Implementations attach to whatever capture mechanism they wrap when
/// started and deliver transitions in the order they were observed. Once
/// `done` fires they stop producing and drop their sender, which closes
/// the returned stream.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Start capturing
    ///
    /// May only be called once per monitor. Fails if the capture layer
    /// cannot be initialized.
    async fn start(&self, done: ShutdownSignal) -> Result<Receiver<SocketTransition>>;
}
