//! HTTP webhook responder client.

use super::ResponseGenerator;
use crate::error::GenerateError;
use async_trait::async_trait;
use hearth_rs_config::WebhookConfig;
use hearth_rs_protocol::{ChatMode, WebhookRequest};
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;

/// Posts `{userId, threadId, message}` to the configured webhook.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: Option<String>,
    test_url: Option<String>,
    auth_token: Option<String>,
}

impl WebhookClient {
    /// Build a client with the configured request timeout.
    pub fn from_config(config: &WebhookConfig) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| GenerateError::NotConfigured(err.to_string()))?;
        info!(
            "webhook client configured (url_set={}, test_url_set={}, timeout_ms={})",
            config.url.is_some(),
            config.test_url.is_some(),
            config.timeout_ms
        );
        Ok(Self {
            client,
            url: config.url.clone(),
            test_url: config.test_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Endpoint for a mode; test mode falls back to the production URL.
    pub fn endpoint(&self, mode: ChatMode) -> Result<&str, GenerateError> {
        let endpoint = match mode {
            ChatMode::Production => self.url.as_deref(),
            ChatMode::Test => match self.test_url.as_deref() {
                Some(url) => Some(url),
                None => {
                    warn!("webhook.test_url is not set, using webhook.url in test mode");
                    self.url.as_deref()
                }
            },
        };
        endpoint.ok_or_else(|| {
            GenerateError::NotConfigured(format!("no webhook url for {} mode", mode.as_str()))
        })
    }
}

#[async_trait]
impl ResponseGenerator for WebhookClient {
    async fn generate(
        &self,
        mode: ChatMode,
        request: &WebhookRequest,
    ) -> Result<String, GenerateError> {
        let endpoint = self.endpoint(mode)?;
        debug!(
            "posting to webhook (mode={}, thread_id={}, message_len={})",
            mode.as_str(),
            request.thread_id,
            request.message.len()
        );
        let mut builder = self.client.post(endpoint).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("webhook rejected request (status={})", status.as_u16());
            return Err(GenerateError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!("webhook responded (body_len={})", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::WebhookClient;
    use crate::error::GenerateError;
    use crate::generator::ResponseGenerator;
    use crate::http_stub::serve_once;
    use hearth_rs_config::WebhookConfig;
    use hearth_rs_protocol::{ChatMode, ThreadId, WebhookRequest};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn client(url: Option<&str>, test_url: Option<&str>) -> WebhookClient {
        WebhookClient::from_config(&WebhookConfig {
            url: url.map(str::to_string),
            test_url: test_url.map(str::to_string),
            ..WebhookConfig::default()
        })
        .expect("client")
    }

    #[test]
    fn mode_selects_endpoint() {
        let client = client(Some("https://hooks/prod"), Some("https://hooks/test"));
        assert_eq!(client.endpoint(ChatMode::Production), Ok("https://hooks/prod"));
        assert_eq!(client.endpoint(ChatMode::Test), Ok("https://hooks/test"));
    }

    #[test]
    fn test_mode_falls_back_to_production_url() {
        let client = client(Some("https://hooks/prod"), None);
        assert_eq!(client.endpoint(ChatMode::Test), Ok("https://hooks/prod"));
    }

    #[test]
    fn missing_url_is_not_configured() {
        let client = client(None, None);
        assert!(matches!(
            client.endpoint(ChatMode::Production),
            Err(GenerateError::NotConfigured(_))
        ));
    }

    fn request() -> WebhookRequest {
        WebhookRequest {
            user_id: "u-1".to_string(),
            thread_id: ThreadId::new("t-1"),
            message: "hello".to_string(),
        }
    }

    fn served(base: &str, auth_token: Option<&str>, timeout_ms: u64) -> WebhookClient {
        WebhookClient::from_config(&WebhookConfig {
            url: Some(format!("{base}/hook")),
            test_url: Some(format!("{base}/hook-test")),
            auth_token: auth_token.map(str::to_string),
            timeout_ms,
        })
        .expect("client")
    }

    #[tokio::test]
    async fn success_returns_the_raw_body() {
        let (base, captured) = serve_once("200 OK", r#"{"output":"hi"}"#, Duration::ZERO).await;
        let client = served(&base, Some("secret"), 2_000);

        let body = client.generate(ChatMode::Test, &request()).await;

        assert_eq!(body, Ok(r#"{"output":"hi"}"#.to_string()));
        let captured = captured.await.expect("request");
        assert_eq!(captured.request_line(), "POST /hook-test HTTP/1.1");
        assert_eq!(captured.header("authorization"), Some("Bearer secret"));
        let payload: Value = serde_json::from_str(&captured.body).expect("json body");
        assert_eq!(
            payload,
            json!({ "userId": "u-1", "threadId": "t-1", "message": "hello" })
        );
    }

    #[tokio::test]
    async fn rejection_reports_the_status() {
        let (base, captured) = serve_once("503 Service Unavailable", "busy", Duration::ZERO).await;
        let client = served(&base, None, 2_000);

        let result = client.generate(ChatMode::Production, &request()).await;

        assert_eq!(result, Err(GenerateError::Status(503)));
        let captured = captured.await.expect("request");
        assert_eq!(captured.request_line(), "POST /hook HTTP/1.1");
        assert_eq!(captured.header("authorization"), None);
    }

    #[tokio::test]
    async fn slow_responder_times_out() {
        let (base, _captured) = serve_once("200 OK", "late", Duration::from_secs(2)).await;
        let client = served(&base, None, 50);

        let result = client.generate(ChatMode::Production, &request()).await;

        assert_eq!(result, Err(GenerateError::Timeout));
    }
}
