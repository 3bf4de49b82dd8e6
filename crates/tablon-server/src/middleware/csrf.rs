//! CSRF protection for state-changing requests

use super::SessionId;
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Headers a client may use to send the token, checked in order
pub const CSRF_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

pub async fn protect(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe_method(req.method()) {
        return Ok(next.run(req).await);
    }

    let session = req
        .extensions()
        .get::<SessionId>()
        .ok_or(ApiError::InvalidCsrfToken)?;

    if let Err(e) = state
        .csrf
        .verify(&session.0, token_from_headers(req.headers()))
    {
        debug!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err(ApiError::InvalidCsrfToken);
    }

    Ok(next.run(req).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    CSRF_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|h| h.to_str().ok()))
}
