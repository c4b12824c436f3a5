//! Publish/subscribe bus for discovery events
//!
//! Events are flat string-keyed maps. Publishing never blocks: every
//! listener owns an unbounded queue and closed listeners are pruned on the
//! next publish.

use async_channel::{Receiver, Sender};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// A bus event: a flat mapping of string keys to values
pub type BusEvent = Map<String, Value>;

/// Anything discovery events can be published to
pub trait Bus: Send + Sync {
    /// Publish an event. Fire-and-forget.
    fn publish(&self, event: BusEvent);
}

/// A subscriber and the keys an event must carry to reach it
#[derive(Debug)]
struct Listener {
    keys: Vec<String>,
    tx: Sender<BusEvent>,
}

impl Listener {
    fn wants(&self, event: &BusEvent) -> bool {
        self.keys.iter().all(|key| event.contains_key(key))
    }
}

/// In-process bus fanning events out to subscribers
#[derive(Debug)]
pub struct MemoryBus {
    name: String,
    listeners: Mutex<Vec<Listener>>,
}

impl MemoryBus {
    /// Create a new bus
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Bus name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to events containing all of `keys`
    ///
    /// An empty key list receives every event.
    pub fn subscribe(&self, keys: &[&str]) -> Receiver<BusEvent> {
        let (tx, rx) = async_channel::unbounded();
        let listener = Listener {
            keys: keys.iter().map(|key| key.to_string()).collect(),
            tx,
        };
        self.lock().push(listener);
        rx
    }

    /// Number of live subscribers
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.lock();
        listeners.retain(|listener| !listener.tx.is_closed());
        listeners.len()
    }

    /// Close every subscription, ending subscriber loops
    pub fn close(&self) {
        for listener in self.lock().drain(..) {
            listener.tx.close();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Bus for MemoryBus {
    fn publish(&self, event: BusEvent) {
        let mut listeners = self.lock();
        listeners.retain(|listener| !listener.tx.is_closed());

        for listener in listeners.iter().filter(|listener| listener.wants(&event)) {
            // unbounded, so this only fails if the receiver just went away
            let _ = listener.tx.try_send(event.clone());
        }
        trace!(bus = %self.name, listeners = listeners.len(), "published event");
    }
}
