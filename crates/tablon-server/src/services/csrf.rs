//! CSRF token service
//!
//! Tokens are HS256-signed claims bound to a session id, so verification
//! needs no server-side token storage. A session may hold any number of
//! valid tokens at once.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("missing CSRF token")]
    Missing,

    #[error("invalid CSRF token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("CSRF token was issued for another session")]
    SessionMismatch,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sid: String,
    nonce: String,
    iat: i64,
    exp: i64,
}

pub struct CsrfService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl CsrfService {
    pub fn new(secret: &str, ttl: std::time::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(1)),
        }
    }

    /// Issue a new token for `session_id`
    pub fn issue(&self, session_id: &str) -> Result<String, CsrfError> {
        let now = Utc::now();
        let claims = Claims {
            sid: session_id.to_string(),
            nonce: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check that `token` was issued by this server for `session_id` and has not expired
    pub fn verify(&self, session_id: &str, token: Option<&str>) -> Result<(), CsrfError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(CsrfError::Missing)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        if data.claims.sid != session_id {
            return Err(CsrfError::SessionMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn service() -> CsrfService {
        CsrfService::new("test-secret", StdDuration::from_secs(3600))
    }

    #[test]
    fn test_issued_token_verifies_for_its_session() {
        let csrf = service();
        let token = csrf.issue("session-a").unwrap();

        assert!(csrf.verify("session-a", Some(&token)).is_ok());
    }

    #[test]
    fn test_every_issued_token_stays_valid() {
        let csrf = service();
        let first = csrf.issue("session-a").unwrap();
        let second = csrf.issue("session-a").unwrap();

        assert_ne!(first, second);
        assert!(csrf.verify("session-a", Some(&first)).is_ok());
        assert!(csrf.verify("session-a", Some(&second)).is_ok());
    }

    #[test]
    fn test_token_from_another_session_is_rejected() {
        let csrf = service();
        let token = csrf.issue("session-a").unwrap();

        let err = csrf.verify("session-b", Some(&token)).unwrap_err();
        assert!(matches!(err, CsrfError::SessionMismatch));
    }

    #[test]
    fn test_missing_or_garbage_token_is_rejected() {
        let csrf = service();

        assert!(matches!(
            csrf.verify("session-a", None),
            Err(CsrfError::Missing)
        ));
        assert!(matches!(
            csrf.verify("session-a", Some("")),
            Err(CsrfError::Missing)
        ));
        assert!(matches!(
            csrf.verify("session-a", Some("not-a-token")),
            Err(CsrfError::Invalid(_))
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let other = CsrfService::new("other-secret", StdDuration::from_secs(3600));
        let token = other.issue("session-a").unwrap();

        assert!(matches!(
            service().verify("session-a", Some(&token)),
            Err(CsrfError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let csrf = CsrfService::new("test-secret", StdDuration::from_secs(0));
        let token = csrf.issue("session-a").unwrap();
        std::thread::sleep(StdDuration::from_millis(1100));

        assert!(matches!(
            csrf.verify("session-a", Some(&token)),
            Err(CsrfError::Invalid(_))
        ));
    }
}
