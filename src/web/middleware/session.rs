use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::db::new_id;
use crate::web::AppState;

pub const SESSION_COOKIE: &str = "session-id";
pub const SESSION_DAYS: i64 = 30;

/// Anonymous visitor id, available to handlers even on the first request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

pub async fn session(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());
    let session_id = existing.clone().unwrap_or_else(new_id);
    req.extensions_mut().insert(SessionId(session_id.clone()));

    let response = next.run(req).await;
    if existing.is_some() {
        return response;
    }

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.config.cookie_secure)
        .max_age(time::Duration::days(SESSION_DAYS));
    (jar.add(cookie), response).into_response()
}
