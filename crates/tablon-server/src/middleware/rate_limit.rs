//! HTTP rate limiting middleware
//!
//! Keys clients by peer IP and adds `X-RateLimit-*` headers to every response.

use crate::error::ApiError;
use crate::services::RateLimitDecision;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

pub async fn enforce(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let decision = state.rate_limiter.check(&client);
    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        warn!("Rate limit exceeded for {}", client);
        ApiError::TooManyRequests.into_response()
    };

    add_rate_limit_headers(response.headers_mut(), &decision);
    response
}

fn add_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_in_seconds),
    );
}
