//! Configuration schema for Hearth.

use hearth_rs_protocol::ChatMode;
use serde::{Deserialize, Serialize};

/// Root config for a Hearth client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HearthConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl HearthConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> HearthConfigBuilder {
        HearthConfigBuilder::default()
    }
}

/// Builder for assembling a `HearthConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct HearthConfigBuilder {
    config: HearthConfig,
}

impl HearthConfigBuilder {
    /// Replace the hosted backend configuration.
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Replace the responder webhook configuration.
    pub fn webhook(mut self, webhook: WebhookConfig) -> Self {
        self.config.webhook = webhook;
        self
    }

    /// Replace the session configuration.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn build(self) -> HearthConfig {
        self.config
    }
}

/// Hosted backend (REST tables) used for threads and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,
    /// Public client key sent as `apikey`.
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Signed-in user's access token; the anon key is used when absent.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_threads_table")]
    pub threads_table: String,
    #[serde(default = "default_messages_table")]
    pub messages_table: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            access_token: None,
            threads_table: default_threads_table(),
            messages_table: default_messages_table(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_threads_table() -> String {
    "threads".to_string()
}

fn default_messages_table() -> String {
    "messages".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Bounded retry applied to idempotent backend reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// Response-generation webhook endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint used in production mode.
    #[serde(default)]
    pub url: Option<String>,
    /// Endpoint used in test mode.
    #[serde(default)]
    pub test_url: Option<String>,
    /// Optional bearer token; the payload itself carries no credential.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            test_url: None,
            auth_token: None,
            timeout_ms: default_webhook_timeout_ms(),
        }
    }
}

fn default_webhook_timeout_ms() -> u64 {
    60_000
}

/// Per-session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Label of the thread resolved at sign-in.
    #[serde(default = "default_thread_label")]
    pub thread_label: String,
    #[serde(default)]
    pub mode: ChatMode,
    /// Capacity of the session event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            thread_label: default_thread_label(),
            mode: ChatMode::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_thread_label() -> String {
    "primary".to_string()
}

fn default_event_buffer() -> usize {
    64
}
