//! Transcript printing.

use chrono::Local;
use hearth_rs_protocol::{Message, MessageId, Role};
use std::collections::HashSet;

/// Format one message for the terminal.
pub fn format_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "hearth",
    };
    format!(
        "[{}] {}: {}",
        message.timestamp.with_timezone(&Local).format("%H:%M"),
        speaker,
        message.content
    )
}

/// Tracks which messages were already printed.
#[derive(Debug, Default)]
pub struct Transcript {
    shown: HashSet<MessageId>,
}

impl Transcript {
    /// Lines for messages in `snapshot` not printed yet. An empty snapshot
    /// means the list was reset, so everything may be printed again.
    pub fn fresh(&mut self, snapshot: &[Message]) -> Vec<String> {
        if snapshot.is_empty() {
            self.shown.clear();
            return Vec::new();
        }
        snapshot
            .iter()
            .filter(|message| self.shown.insert(message.id.clone()))
            .map(format_message)
            .collect()
    }
}
