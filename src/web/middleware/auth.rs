use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::debug;

use crate::db::enums::{has_permission, Role};
use crate::services::auth_service;
use crate::web::{error::AppError, models::AuthenticatedUser, AppState};

pub const AUTH_COOKIE: &str = "auth-token";

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller from the `auth-token` cookie, falling back to a bearer
/// header, and stores it in the request extensions.
pub async fn auth(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(req.headers()).map(str::to_string))
        .ok_or_else(|| AppError::Unauthorized("로그인이 필요합니다.".to_string()))?;

    let claims = auth_service::verify_token(&token, &app_state.config.jwt_secret).ok_or_else(|| {
        AppError::Unauthorized("인증이 만료되었거나 유효하지 않습니다.".to_string())
    })?;

    req.extensions_mut().insert(AuthenticatedUser::from(claims));
    Ok(next.run(req).await)
}

/// Parent routes admit parents only; every other level follows the rank order.
pub fn admits(role: Role, required: Role) -> bool {
    match required {
        Role::Parent => role == Role::Parent,
        _ => has_permission(role, required),
    }
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// Route layer that must sit inside `auth`.
///
/// ```ignore
/// Router::new()
///     .route("/", get(list))
///     .route_layer(middleware::from_fn(require_role(Role::Admin)))
///     .route_layer(middleware::from_fn_with_state(state, auth));
/// ```
pub fn require_role(required: Role) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<AuthenticatedUser>()
                .ok_or_else(|| AppError::Unauthorized("로그인이 필요합니다.".to_string()))?;

            if !admits(user.role, required) {
                debug!(user_id = %user.id, role = %user.role, required = %required, "Role check failed.");
                return Err(AppError::Forbidden("접근 권한이 없습니다.".to_string()));
            }
            Ok(next.run(req).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        assert!(admits(Role::Admin, Role::Teacher));
        assert!(admits(Role::Teacher, Role::Teacher));
        assert!(!admits(Role::Student, Role::Teacher));
        assert!(!admits(Role::Parent, Role::Student));
        assert!(admits(Role::Parent, Role::Parent));
        assert!(!admits(Role::Admin, Role::Parent));
    }

    #[test]
    fn test_bearer_token() {
        let req = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(req.headers()), Some("abc.def"));

        let req = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(req.headers()), None);
    }
}
