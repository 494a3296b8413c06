//! Session lifecycle states and the events views observe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, ThreadId};

/// Client-only correlation id, regenerated when the chat mode changes.
pub type SessionId = Uuid;

/// Which responder endpoint the session targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Production,
    Test,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Production => "production",
            ChatMode::Test => "test",
        }
    }
}

/// Why the conversation thread could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum ThreadUnavailable {
    /// The lookup ran and found no thread for the label.
    NotFound,
    /// The store could not be queried.
    Unreachable(String),
}

/// Coordinator lifecycle state for one signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SessionState {
    Uninitialized,
    ResolvingThread,
    LoadingHistory,
    Ready,
    Sending,
    ThreadUnavailable(ThreadUnavailable),
}

/// Notifications published whenever the session changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum SessionEvent {
    /// Lifecycle state transitioned.
    StateChanged {
        session_id: SessionId,
        state: SessionState,
    },
    /// The visible message list changed; carries a full snapshot.
    MessagesChanged {
        session_id: SessionId,
        thread_id: Option<ThreadId>,
        messages: Vec<Message>,
    },
    /// The responder endpoint changed and a new session id was issued.
    ModeChanged {
        session_id: SessionId,
        mode: ChatMode,
    },
}
