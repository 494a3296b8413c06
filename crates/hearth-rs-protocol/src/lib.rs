//! Wire and domain types shared by the Hearth crates.
//!
//! Everything that crosses a seam (store rows, realtime change events, the
//! webhook payload, session events observed by views) lives here so adapters
//! and the coordinator agree on one shape.

mod message;
mod session;
mod webhook;

pub use message::{Message, MessageId, MessageRow, Role, ThreadId, UserId};
pub use session::{ChatMode, SessionEvent, SessionId, SessionState, ThreadUnavailable};
pub use webhook::WebhookRequest;

/// Realtime notification that a row was inserted into a thread.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangeEvent {
    /// Thread the subscription was scoped to.
    pub thread_id: ThreadId,
    /// Inserted row payload.
    pub row: MessageRow,
}

/// Sink interface for session events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: SessionEvent);
}
