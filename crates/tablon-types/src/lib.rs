//! Tablon Types - Wire types shared by the message board API
//!
//! This crate contains only pure data types with no async runtime dependencies.

pub mod message;
pub mod user;

pub use message::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// JSON body returned for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response of `GET /csrf-token`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_token_response_uses_camel_case() {
        let body = CsrfTokenResponse {
            csrf_token: "abc".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "csrfToken": "abc" }));
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_string(&ErrorBody::new("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }
}
