use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use solace_types::events::ChangeEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans out change events to every live watcher.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for change events. Every watcher receives every event
    broadcast_tx: broadcast::Sender<ChangeEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to change events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Having no watchers is not an error.
    pub fn broadcast(&self, event: ChangeEvent) {
        trace!(collection = %event.collection, document = %event.document_id, kind = ?event.kind, "change");
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
