//! Deduplicated, time-ordered message list.

use hearth_rs_protocol::{Message, MessageId};
use std::collections::HashSet;

/// Visible conversation for one thread.
///
/// Messages are unique by id and sorted by timestamp; equal timestamps keep
/// arrival order. Ids can also be reserved without a visible entry so that
/// later copies of a hidden message are dropped.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
}

impl Timeline {
    /// Insert unless the id was seen before. Returns whether the list changed.
    pub(crate) fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|existing| existing.timestamp <= message.timestamp);
        self.messages.insert(at, message);
        true
    }

    /// Insert every message, returning whether any was new.
    pub(crate) fn extend(&mut self, messages: impl IntoIterator<Item = Message>) -> bool {
        messages
            .into_iter()
            .fold(false, |changed, message| self.insert(message) || changed)
    }

    /// Mark an id as seen without showing it.
    pub(crate) fn reserve(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }

    pub(crate) fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
