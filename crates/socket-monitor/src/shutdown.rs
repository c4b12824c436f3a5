//! Shared shutdown signal
//!
//! A [`ShutdownSignal`] is a cloneable "done" indicator. Nothing is ever sent
//! on the inner channel; triggering closes it, which wakes every waiter.

use async_channel::{Receiver, Sender};

/// Cloneable one-shot shutdown indicator shared between a monitor and its consumers
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Create a new, untriggered signal
    pub fn new() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { tx, rx }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.close();
    }

    /// Whether the signal has fired
    pub fn is_triggered(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the signal fires
    pub async fn wait(&self) {
        // recv only fails once the channel is closed
        let _ = self.rx.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_shared_across_clones() {
        let signal = ShutdownSignal::new();
        let other = signal.clone();
        assert!(!other.is_triggered());

        signal.trigger();
        signal.trigger();
        assert!(other.is_triggered());
    }

    #[smol_potat::test]
    async fn test_wait_returns_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        let task = smol::spawn(async move {
            waiter.wait().await;
            true
        });

        signal.trigger();
        assert!(task.await);
    }
}
