//! Broadcast event bus for session events.

use hearth_rs_protocol::{EventSink, SessionEvent};
use log::debug;
use tokio::sync::broadcast;

/// Broadcast-backed sink views subscribe to.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("session event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
