#![forbid(unsafe_code)]

use tokio::sync::broadcast;

use crate::PlayerEvent;

/// Per-player notification channel.
///
/// The player publishes from the scheduler thread; any number of observers
/// subscribe. `publish()` is a sync call, safe from blocking threads, and
/// events are silently dropped when nobody is listening.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to all future events.
    ///
    /// Each subscriber gets an independent receiver. Slow subscribers see
    /// `RecvError::Lagged(n)` instead of blocking the publisher.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }
}
