//! Conversation messages and the row shape the store speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque message identifier, client or server assigned.
pub type MessageId = String;

/// Identity of the signed-in user as issued by the auth provider.
pub type UserId = String;

/// Identifier of the durable conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the human.
    User,
    /// Written by the responder or injected locally.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role; anything but `user` is treated as assistant.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// A single utterance in the visible conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique id within the thread.
    pub id: MessageId,
    /// Message text, may carry lightweight markup.
    pub content: String,
    /// Author of the message.
    pub role: Role,
    /// Creation time, the only ordering key.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message with a fresh client-side id stamped now.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Convert into the row shape written to the store.
    pub fn to_row(&self, thread_id: &ThreadId, user_id: &str) -> MessageRow {
        MessageRow {
            id: self.id.clone(),
            thread_id: Some(thread_id.clone()),
            user_id: Some(user_id.to_string()),
            content: self.content.clone(),
            role: self.role.as_str().to_string(),
            created_at: self.timestamp,
        }
    }
}

/// Message row as stored remotely and delivered by the change feed.
///
/// History and realtime payloads only guarantee `id`, `role`, `content` and
/// `created_at`; the owning columns are optional when decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRow {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub content: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// Tables keyed by bigint deliver numeric ids.
fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<MessageId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            role: Role::parse(&row.role),
            timestamp: row.created_at,
        }
    }
}
