use hearth_rs_protocol::{EventSink, SessionEvent};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<Vec<SessionEvent>>>) {
        let sink = Self::default();
        let events = sink.events.clone();
        (sink, events)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}
