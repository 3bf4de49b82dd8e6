//! Message types

use super::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a submitted message
pub const MAX_CONTENT_CHARS: usize = 255;

/// A message joined with its sender, as served to clients and held in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMessage {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender: User,
}

/// Body of `POST /messages`
///
/// Fields are kept loosely typed so that malformed input is reported by the
/// ingestion validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    #[serde(default)]
    pub sender_id: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl SubmitMessageRequest {
    pub fn new(sender_id: i64, content: impl Into<String>) -> Self {
        Self {
            sender_id: Some(serde_json::Value::from(sender_id)),
            content: Some(serde_json::Value::String(content.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_message_serializes_nested_sender() {
        let message = CachedMessage {
            id: 7,
            content: "hola".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            sender: User {
                id: 2,
                name: "Bob".to_string(),
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["content"], "hola");
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00Z");
        assert_eq!(json["sender"]["id"], 2);
        assert_eq!(json["sender"]["name"], "Bob");
    }

    #[test]
    fn test_submit_request_accepts_missing_fields() {
        let req: SubmitMessageRequest = serde_json::from_str(r#"{"content": 5}"#).unwrap();
        assert!(req.sender_id.is_none());
        assert_eq!(req.content, Some(serde_json::Value::from(5)));
    }
}
