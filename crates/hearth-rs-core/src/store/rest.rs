//! PostgREST-style adapter for a hosted backend.

use super::ChatStore;
use crate::error::StoreError;
use crate::window::HistoryWindow;
use async_trait::async_trait;
use chrono::SecondsFormat;
use hearth_rs_config::BackendConfig;
use hearth_rs_protocol::{MessageRow, ThreadId, UserId};
use log::{debug, info, warn};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

const MESSAGE_COLUMNS: &str = "id,thread_id,user_id,role,content,created_at";

/// Thread and message tables reached over the backend's REST interface.
#[derive(Clone)]
pub struct RestChatStore {
    client: Client,
    base_url: String,
    anon_key: String,
    bearer: String,
    threads_table: String,
    messages_table: String,
}

impl std::fmt::Debug for RestChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestChatStore")
            .field("base_url", &self.base_url)
            .field("threads_table", &self.threads_table)
            .field("messages_table", &self.messages_table)
            .finish()
    }
}

impl RestChatStore {
    /// Build a store from backend settings; `url` and `anon_key` are required.
    pub fn from_config(config: &BackendConfig) -> Result<Self, StoreError> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| StoreError::NotConfigured("backend.url is not set".to_string()))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| StoreError::NotConfigured("backend.anon_key is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| StoreError::NotConfigured(err.to_string()))?;
        let bearer = config
            .access_token
            .clone()
            .unwrap_or_else(|| anon_key.clone());
        info!(
            "rest store configured (base_url={}, threads_table={}, messages_table={})",
            base_url, config.threads_table, config.messages_table
        );
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            bearer,
            threads_table: config.threads_table.clone(),
            messages_table: config.messages_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer)
    }
}

/// Fail with the status and body on a non-success response.
async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ChatStore for RestChatStore {
    async fn find_thread(
        &self,
        user_id: &UserId,
        label: &str,
    ) -> Result<Option<ThreadId>, StoreError> {
        let response = self
            .request(Method::GET, &self.threads_table)
            .query(&[
                ("select", "id".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("label", format!("eq.{label}")),
                ("limit", "2".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<Value> = ensure_success(response).await?.json().await?;
        if rows.len() > 1 {
            warn!(
                "multiple threads match label, using the first (user_id={}, label={})",
                user_id, label
            );
        }
        let Some(row) = rows.first() else {
            debug!("no thread for label (user_id={}, label={})", user_id, label);
            return Ok(None);
        };
        let id = row
            .get("id")
            .and_then(id_text)
            .ok_or_else(|| StoreError::Decode("thread row has no usable id".to_string()))?;
        Ok(Some(ThreadId::new(id)))
    }

    async fn load_history(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        window: &HistoryWindow,
    ) -> Result<Vec<MessageRow>, StoreError> {
        let start = window.start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = window.end.to_rfc3339_opts(SecondsFormat::Millis, true);
        let response = self
            .request(Method::GET, &self.messages_table)
            .query(&[
                ("select", MESSAGE_COLUMNS.to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("thread_id", format!("eq.{thread_id}")),
                ("created_at", format!("gte.{start}")),
                ("created_at", format!("lt.{end}")),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<MessageRow> = ensure_success(response).await?.json().await?;
        debug!(
            "history loaded (thread_id={}, rows={}, start={}, end={})",
            thread_id,
            rows.len(),
            start,
            end
        );
        Ok(rows)
    }

    async fn insert_message(&self, row: &MessageRow) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, &self.messages_table)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!("message inserted (message_id={}, role={})", row.id, row.role);
        Ok(())
    }
}
