//! Wire-level data types shared by the backend client, the mock backend and the UI.
//!
//! These mirror the JSON shapes of the `/upload`, `/chat` and `/chart`
//! endpoints and don't depend on any UI framework.

use serde::{Deserialize, Serialize};

use crate::chart::ChartPayload;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    /// Build a locally-authored user turn. The id is derived from the send time.
    pub fn user(content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: format!("user-{}", now_ms),
            role: ChatRole::User,
            content: content.into(),
            timestamp: now_ms,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: now_ms,
        }
    }
}

/// A suggested next prompt returned alongside an assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_questions: Option<Vec<FollowUpQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub message: String,
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
}

/// Body of `POST /chart`
#[derive(Debug, Clone, Serialize)]
pub struct ChartRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;

    #[test]
    fn test_user_message_id_from_timestamp() {
        let msg = ChatMessage::user("hello", 1_700_000_000_123);
        assert_eq!(msg.id, "user-1700000000123");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.timestamp, 1_700_000_000_123);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::assistant("a1", "hi", 5);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_chat_response_with_extras() {
        let json = serde_json::json!({
            "message": { "id": "m1", "role": "assistant", "content": "Here", "timestamp": 10 },
            "followUpQuestions": [{ "id": "q1", "text": "More?" }],
            "chartData": {
                "type": "line",
                "data": { "labels": ["a"], "datasets": [{ "data": [1.0] }] }
            }
        });
        let resp: ChatResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.follow_up_questions.unwrap()[0].text, "More?");
        match resp.chart_data {
            Some(ChartPayload::Series(series)) => assert_eq!(series.kind, ChartKind::Line),
            other => panic!("unexpected chart data: {:?}", other),
        }
    }

    #[test]
    fn test_chat_response_without_extras() {
        let json = serde_json::json!({
            "message": { "id": "m1", "role": "assistant", "content": "Plain", "timestamp": 10 }
        });
        let resp: ChatResponse = serde_json::from_value(json).unwrap();
        assert!(resp.follow_up_questions.is_none());
        assert!(resp.chart_data.is_none());
    }

    #[test]
    fn test_chart_request_omits_missing_data() {
        let req = ChartRequest { prompt: "line please".to_string(), data: None };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_upload_response_camel_case() {
        let resp: UploadResponse = serde_json::from_str(
            r#"{"success":true,"fileIds":["a","b"],"message":"ok"}"#,
        )
        .unwrap();
        assert_eq!(resp.file_ids, vec!["a", "b"]);
    }
}
