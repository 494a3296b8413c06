//! Response-generation seam.

mod webhook;

pub use webhook::WebhookClient;

use crate::error::GenerateError;
use async_trait::async_trait;
use hearth_rs_protocol::{ChatMode, WebhookRequest};

/// External responder that turns a user message into a reply body.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Submit one message and return the raw response body.
    ///
    /// Not idempotent: callers must not retry.
    async fn generate(
        &self,
        mode: ChatMode,
        request: &WebhookRequest,
    ) -> Result<String, GenerateError>;
}
