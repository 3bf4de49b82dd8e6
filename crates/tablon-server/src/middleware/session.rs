//! Cookie-backed sessions
//!
//! Every request leaves this layer with a live `SessionId` in its extensions.
//! Visitors without one get a new session and a `Set-Cookie` on the response.

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

/// Cookie name carrying the session id
pub const SESSION_COOKIE: &str = "tablon.sid";

/// Session of the current request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

pub async fn ensure_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| state.sessions.is_active(id));

    match existing {
        Some(id) => {
            req.extensions_mut().insert(SessionId(id));
            next.run(req).await
        }
        None => {
            let id = state.sessions.create();
            debug!("New session created ({} active)", state.sessions.len());
            req.extensions_mut().insert(SessionId(id.clone()));

            let response = next.run(req).await;
            let jar = jar.add(session_cookie(id, state.secure_cookies));
            (jar, response).into_response()
        }
    }
}

fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
