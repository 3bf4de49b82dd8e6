//! Message handlers

use crate::error::{
    ApiError, INVALID_MESSAGE, INVALID_PAGINATION, LIST_MESSAGES_FAILED, SUBMIT_MESSAGE_FAILED,
};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tablon_types::{CachedMessage, SubmitMessageRequest};

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_OFFSET: i64 = 0;

/// Raw pagination parameters, parsed by hand so bad values yield our 400 body
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    limit: Option<String>,
    offset: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<CachedMessage>>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::BadRequest(INVALID_PAGINATION))?;
    let limit = parse_param(params.limit.as_deref(), DEFAULT_LIMIT)?;
    let offset = parse_param(params.offset.as_deref(), DEFAULT_OFFSET)?;

    let messages = state
        .messages
        .list_messages(limit, offset)
        .await
        .map_err(|e| ApiError::from_message_error(e, LIST_MESSAGES_FAILED))?;

    Ok(Json(messages))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<SubmitMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CachedMessage>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest(INVALID_MESSAGE))?;

    let message = state
        .messages
        .submit(req)
        .await
        .map_err(|e| ApiError::from_message_error(e, SUBMIT_MESSAGE_FAILED))?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Absent or blank values take the default; anything else must be an integer.
fn parse_param(value: Option<&str>, default: i64) -> Result<i64, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest(INVALID_PAGINATION)),
    }
}
