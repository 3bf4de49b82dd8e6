//! User handlers

use crate::error::{ApiError, LIST_USERS_FAILED};
use crate::AppState;
use axum::{extract::State, Json};
use tablon_types::User;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .messages
        .list_users()
        .await
        .map_err(|e| ApiError::from_message_error(e, LIST_USERS_FAILED))?;

    Ok(Json(users))
}
