//! Tablon Server
//!
//! A small message board REST API: list and post messages, list users.
//! SQLite is the source of truth; the newest messages are served from an
//! in-memory cache. Writes require a session-bound CSRF token and every
//! client is rate limited.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tablon_types::ErrorBody;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::services::{CsrfService, MessageService, RateLimiter};
use crate::storage::{seed, MessageCache, MessageStore, SessionStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<MessageService>,
    pub sessions: Arc<SessionStore>,
    pub csrf: Arc<CsrfService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire services around `store`. Must be called inside a Tokio runtime.
    pub fn new(store: Arc<dyn MessageStore>, config: &ServerConfig) -> Self {
        let cache = Arc::new(MessageCache::new(config.cache_max_size));

        Self {
            messages: Arc::new(MessageService::new(store, cache)),
            sessions: Arc::new(SessionStore::new(config.session_ttl())),
            csrf: Arc::new(CsrfService::new(
                &config.session_secret,
                config.session_ttl(),
            )),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit())),
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Seed the store, build the state and warm the message cache.
///
/// A failed cache refresh is logged and the server starts anyway; the store
/// still answers every request the cache cannot.
pub async fn prepare(store: Arc<dyn MessageStore>, config: &ServerConfig) -> Result<AppState> {
    seed::seed_defaults(&*store)
        .await
        .context("Failed to seed database")?;

    let state = AppState::new(store, config);
    if let Err(e) = state.messages.refresh_cache().await {
        error!("Failed to refresh message cache: {}", e);
    }

    Ok(state)
}

/// Build the HTTP router
pub fn build_router(state: AppState, allowed_origin: &str) -> Result<Router> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("Invalid allowed origin: {}", allowed_origin))?;

    let mut allowed_headers = vec![header::CONTENT_TYPE];
    allowed_headers.extend(
        middleware::csrf::CSRF_HEADERS
            .iter()
            .map(|name| HeaderName::from_static(*name)),
    );

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(allowed_headers);

    info!("CORS allowed origin: {}", allowed_origin);

    let router = Router::new()
        .route(
            "/messages",
            get(handlers::messages::list).post(handlers::messages::create),
        )
        .route("/csrf-token", get(handlers::csrf::token))
        .route("/users", get(handlers::users::list))
        // Layers, innermost first. Rate limiting runs before any session is
        // created or CSRF token checked.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf::protect,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session::ensure_session,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce,
        ))
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(error::UNEXPECTED_ERROR)),
    )
        .into_response()
}
