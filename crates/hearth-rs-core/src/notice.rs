//! Plain-language texts shown in place of technical failures.

use crate::error::GenerateError;
use hearth_rs_protocol::ThreadUnavailable;
use serde::{Deserialize, Serialize};

/// Advisory shown when the responder produced an empty body.
pub const NO_RESPONSE: &str = "I didn't get a response just now. Could you try saying that again?";

const THREAD_NOT_FOUND: &str =
    "I couldn't find your conversation. Please sign out and back in, or try again shortly.";
const THREAD_UNREACHABLE: &str =
    "I can't reach your conversation history right now. Please check your connection and try again.";

/// Notice for a conversation thread that cannot be used.
pub fn thread_unavailable(reason: &ThreadUnavailable) -> &'static str {
    match reason {
        ThreadUnavailable::NotFound => THREAD_NOT_FOUND,
        ThreadUnavailable::Unreachable(_) => THREAD_UNREACHABLE,
    }
}

/// Failure category of a response-generation round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    ServerFault,
    BadRequest,
    Forbidden,
    EndpointMissing,
    RateLimited,
    Rejected,
    NotConfigured,
}

impl FailureKind {
    /// Map a non-success HTTP status to its category.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => FailureKind::BadRequest,
            401 | 403 => FailureKind::Forbidden,
            404 => FailureKind::EndpointMissing,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ServerFault,
            _ => FailureKind::Rejected,
        }
    }

    /// Text of the assistant message synthesized for this failure.
    pub fn notice(&self) -> &'static str {
        match self {
            FailureKind::Transport => {
                "I'm having trouble connecting right now. Please check your internet connection and try again."
            }
            FailureKind::Timeout => {
                "I'm taking longer than usual to respond. Please try again in a moment."
            }
            FailureKind::ServerFault => {
                "Something went wrong on my side. Please try again in a little while."
            }
            FailureKind::BadRequest => {
                "I couldn't understand that request. Could you try rephrasing your message?"
            }
            FailureKind::Forbidden => {
                "I'm not allowed to respond to that right now. Please sign in again and retry."
            }
            FailureKind::EndpointMissing => {
                "I can't find my response service at the moment. Please try again later."
            }
            FailureKind::RateLimited => {
                "We're talking a little too fast for me. Please wait a moment and try again."
            }
            FailureKind::Rejected => "I couldn't respond to that just now. Please try again.",
            FailureKind::NotConfigured => {
                "I'm not set up to respond yet. Please check the app configuration."
            }
        }
    }
}

impl From<&GenerateError> for FailureKind {
    fn from(err: &GenerateError) -> Self {
        match err {
            GenerateError::NotConfigured(_) => FailureKind::NotConfigured,
            GenerateError::Transport(_) => FailureKind::Transport,
            GenerateError::Timeout => FailureKind::Timeout,
            GenerateError::Status(status) => FailureKind::from_status(*status),
        }
    }
}
