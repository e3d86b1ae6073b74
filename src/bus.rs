//! In-process event bus
//!
//! Scan lifecycle, camera housekeeping, detail-view changes and toast
//! notifications all go through one broadcast channel. The SSE endpoint and
//! the tests subscribe to it; publishers never block on slow subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

pub use resort_wire::{CheckinEvent as BusEvent, Notification};

/// Channel capacity; lagging subscribers skip ahead instead of blocking
const BUS_CAPACITY: usize = 256;

pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

pub type SharedBus = Arc<EventBus>;

pub fn create_bus() -> SharedBus {
    let (tx, _) = broadcast::channel(BUS_CAPACITY);
    Arc::new(EventBus { tx })
}

impl EventBus {
    pub fn publish(&self, event: BusEvent) {
        debug!(event_type = event.event_type(), "bus publish");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Publish a toast notification
    pub fn notify(&self, notification: Notification) {
        self.publish(BusEvent::Notify(notification));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }
}
