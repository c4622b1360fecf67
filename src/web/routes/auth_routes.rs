use axum::{
    extract::{Extension, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::entities::user::UserResponse;
use crate::services::auth_service::{self, IssuedToken};
use crate::web::{
    error::AppError,
    extract::AppJson,
    middleware::auth::{self, AUTH_COOKIE},
    models::AuthenticatedUser,
    response::ApiResponse,
    validation, AppState,
};

/// Credential endpoints. The caller mounts them behind the strict rate tier.
pub fn create_login_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/parent-login", post(parent_login))
}

pub fn create_session_router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route_layer(from_fn_with_state(app_state, auth::auth))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ParentLoginRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    /// Same value as the cookie, for clients that send a bearer header instead.
    pub token: String,
}

fn auth_cookie(issued: &IssuedToken, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(issued.ttl.num_seconds()))
        .build()
}

fn required_password(value: Option<&str>) -> Result<String, AppError> {
    // Passwords are compared verbatim; only emptiness is checked.
    match value {
        Some(password) if !password.is_empty() => Ok(password.to_string()),
        _ => Err(AppError::InvalidInput("비밀번호를 입력해주세요.".to_string())),
    }
}

async fn login(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), AppError> {
    let username = validation::required(payload.username.as_deref(), "아이디", validation::MAX_SHORT_TEXT)?;
    let password = required_password(payload.password.as_deref())?;

    let (user, issued) =
        auth_service::login_user(&app_state.db, &username, &password, &app_state.config.jwt_secret).await?;

    let jar = jar.add(auth_cookie(&issued, app_state.config.cookie_secure));
    Ok((
        jar,
        ApiResponse::ok_with_message(
            LoginResponse {
                user: user.into(),
                token: issued.token,
            },
            "로그인되었습니다.",
        ),
    ))
}

async fn parent_login(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(payload): AppJson<ParentLoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), AppError> {
    let phone = validation::required_phone(payload.phone.as_deref(), "연락처")?;
    let password = required_password(payload.password.as_deref())?;

    let (user, issued) =
        auth_service::login_parent(&app_state.db, &phone, &password, &app_state.config.jwt_secret).await?;

    let jar = jar.add(auth_cookie(&issued, app_state.config.cookie_secure));
    Ok((
        jar,
        ApiResponse::ok_with_message(
            LoginResponse {
                user: user.into(),
                token: issued.token,
            },
            "로그인되었습니다.",
        ),
    ))
}

async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, ApiResponse::message("로그아웃되었습니다."))
}

async fn me(Extension(auth_user): Extension<AuthenticatedUser>) -> ApiResponse<AuthenticatedUser> {
    ApiResponse::ok(auth_user)
}
