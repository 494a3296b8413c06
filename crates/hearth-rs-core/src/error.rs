//! Error types for the session coordinator and its adapters.

use crate::notice;
use hearth_rs_protocol::ThreadUnavailable;
use thiserror::Error;

/// Errors returned by `ChatStore` and `ChangeFeed` implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Required connection settings are missing.
    #[error("store not configured: {0}")]
    NotConfigured(String),
    /// Network-level failure.
    #[error("store request failed: {0}")]
    Transport(String),
    /// The request exceeded its timeout.
    #[error("store request timed out")]
    Timeout,
    /// The store answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not match the expected row shape.
    #[error("failed to decode store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether repeating an idempotent request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Timeout => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            StoreError::NotConfigured(_) | StoreError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Errors returned by `ResponseGenerator` implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerateError {
    /// No endpoint is configured for the requested mode.
    #[error("responder not configured: {0}")]
    NotConfigured(String),
    /// Network-level failure.
    #[error("responder request failed: {0}")]
    Transport(String),
    /// The request exceeded its timeout.
    #[error("responder request timed out")]
    Timeout,
    /// The responder answered with a non-success status.
    #[error("responder returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerateError::Timeout
        } else {
            GenerateError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by `ChatSession` operations.
///
/// Conversational failures never show up here; they become assistant
/// messages. These variants are the cases where nothing was sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No user is signed in, or the session ended mid-flight.
    #[error("no active session")]
    SignedOut,
    /// Input was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,
    /// Another send is still outstanding.
    #[error("a message is already being sent")]
    Busy,
    /// The conversation thread could not be resolved.
    #[error("{}", notice::thread_unavailable(.0))]
    ThreadUnavailable(ThreadUnavailable),
}
