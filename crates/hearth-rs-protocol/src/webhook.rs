//! Payload posted to the response-generation webhook.

use serde::{Deserialize, Serialize};

use crate::message::{ThreadId, UserId};

/// Request body for the responder: `{ userId, threadId, message }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub user_id: UserId,
    pub thread_id: ThreadId,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::WebhookRequest;
    use crate::ThreadId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_fields() {
        let request = WebhookRequest {
            user_id: "u-1".to_string(),
            thread_id: ThreadId::new("t-1"),
            message: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({ "userId": "u-1", "threadId": "t-1", "message": "hello" })
        );
    }
}
