//! CSRF token handler

use crate::error::{ApiError, CSRF_TOKEN_FAILED};
use crate::middleware::SessionId;
use crate::AppState;
use axum::{extract::State, Extension, Json};
use tablon_types::CsrfTokenResponse;

/// Issue a token bound to the caller's session
pub async fn token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<CsrfTokenResponse>, ApiError> {
    let csrf_token = state
        .csrf
        .issue(&session.0)
        .map_err(|e| ApiError::internal(CSRF_TOKEN_FAILED, e))?;

    Ok(Json(CsrfTokenResponse { csrf_token }))
}
