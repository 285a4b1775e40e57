//! Fire-and-forget delivery of session events to the host

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

use presslink_core::prelude::*;
use presslink_core::{ButtonEvent, Notification};

/// Receiving end of the host notification channel
///
/// Implementations wrap whatever transport the embedder speaks. `notify`
/// runs on the dispatch task, so a slow sink delays later notifications but
/// never the session layer itself.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Fans session events into the single attached host sink
///
/// `emit` never blocks and never fails: events queue in arrival order and a
/// dedicated task encodes and delivers them one at a time. With no sink
/// attached the queue still drains and those events are dropped. This is a
/// live notification channel, not a durable log.
///
/// Cloning is cheap; clones feed the same queue. Must be created inside a
/// tokio runtime.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::UnboundedSender<ButtonEvent>,
    sink: Arc<RwLock<Option<Arc<dyn EventSink>>>>,
}

impl EventDispatcher {
    /// Create the dispatcher and spawn its delivery task
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<RwLock<Option<Arc<dyn EventSink>>>> = Arc::new(RwLock::new(None));
        tokio::spawn(deliver(rx, Arc::clone(&sink)));
        Self { tx, sink }
    }

    /// Route notifications to this sink from now on
    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Stop routing; events are dropped until a new sink attaches
    pub fn detach(&self) {
        *self.sink.write() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sink.read().is_some()
    }

    /// Queue an event for delivery; never blocks
    pub fn emit(&self, event: ButtonEvent) {
        trace!("emit {}", event.summary());
        if self.tx.send(event).is_err() {
            // Delivery task only goes away during runtime teardown
            debug!("dispatcher delivery task gone, dropping event");
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<ButtonEvent>,
    sink: Arc<RwLock<Option<Arc<dyn EventSink>>>>,
) {
    while let Some(event) = rx.recv().await {
        // Clone the sink handle out so the guard is gone before awaiting
        let attached = sink.read().clone();
        match attached {
            Some(sink) => {
                let notification = Notification::for_event(&event);
                sink.notify(notification).await;
            }
            None => trace!("no sink attached, dropping {}", event.summary()),
        }
    }
    debug!("dispatcher event channel closed");
}
