use async_trait::async_trait;
use hearth_rs_core::{GenerateError, ResponseGenerator};
use hearth_rs_protocol::{ChatMode, WebhookRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct FixedGenerator {
    body: String,
}

impl FixedGenerator {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl ResponseGenerator for FixedGenerator {
    async fn generate(
        &self,
        _mode: ChatMode,
        _request: &WebhookRequest,
    ) -> Result<String, GenerateError> {
        Ok(self.body.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FailingGenerator {
    error: GenerateError,
}

impl FailingGenerator {
    pub fn new(error: GenerateError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl ResponseGenerator for FailingGenerator {
    async fn generate(
        &self,
        _mode: ChatMode,
        _request: &WebhookRequest,
    ) -> Result<String, GenerateError> {
        Err(self.error.clone())
    }
}

type Calls = Arc<Mutex<Vec<(ChatMode, WebhookRequest)>>>;

#[derive(Clone)]
pub struct RecordingGenerator {
    body: String,
    calls: Calls,
}

impl RecordingGenerator {
    pub fn new(body: impl Into<String>) -> (Self, Calls) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                body: body.into(),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl ResponseGenerator for RecordingGenerator {
    async fn generate(
        &self,
        mode: ChatMode,
        request: &WebhookRequest,
    ) -> Result<String, GenerateError> {
        self.calls.lock().push((mode, request.clone()));
        Ok(self.body.clone())
    }
}

/// Control side of a `GatedGenerator` or a gated store lookup.
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Wait until a request reached the generator.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the pending request answer.
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub(crate) async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// Holds each request until the gate is released.
#[derive(Clone)]
pub struct GatedGenerator {
    body: String,
    gate: Gate,
}

impl GatedGenerator {
    pub fn new(body: impl Into<String>) -> (Self, Gate) {
        let gate = Gate::default();
        (
            Self {
                body: body.into(),
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl ResponseGenerator for GatedGenerator {
    async fn generate(
        &self,
        _mode: ChatMode,
        _request: &WebhookRequest,
    ) -> Result<String, GenerateError> {
        self.gate.pass().await;
        Ok(self.body.clone())
    }
}
