use academy_server::db::{entities::user::User, enums::Role};
use academy_server::notifications::service::NotificationService;
use academy_server::payments::{PaymentError, PaymentGateway, ProviderPayment};
use academy_server::server::config::ServerConfig;
use academy_server::services::auth_service::{self, Claims};
use academy_server::web::{create_axum_router, middleware::rate_limit::RateLimiter, AppState};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

const JWT_SECRET: &str = "integration-test-secret";
const CRON_SECRET: &str = "cron-test-secret";

struct UnreachableGateway;

#[async_trait]
impl PaymentGateway for UnreachableGateway {
    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        Err(PaymentError::NotFound(payment_id.to_string()))
    }

    async fn cancel_payment(&self, _payment_id: &str, _reason: &str) -> Result<(), PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

/// Router over a client that never connects: every request checked here is
/// answered before the handler touches the database.
async fn test_app() -> Router {
    let mut config = ServerConfig::for_tests("mongodb://127.0.0.1:1", JWT_SECRET);
    config.cron_secret = Some(CRON_SECRET.to_string());
    let client = mongodb::Client::with_uri_str(&config.database_url).await.unwrap();

    let app_state = Arc::new(AppState {
        db: client.database("academy_test"),
        config: Arc::new(config),
        rate_limiter: Arc::new(RateLimiter::new()),
        notifications: Arc::new(NotificationService::disabled()),
        payments: Arc::new(UnreachableGateway),
        news_source: None,
    });
    create_axum_router(app_state)
}

fn user(role: Role) -> User {
    User {
        id: format!("{role}-1"),
        username: format!("{role}01"),
        password_hash: String::new(),
        role,
        name: "테스트".to_string(),
        email: None,
        phone: None,
        student_ids: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn token_for(role: Role) -> String {
    auth_service::issue_token(&user(role), JWT_SECRET).unwrap().token
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("auth-token={token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_sets_session_cookie() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("session-id="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_existing_session_is_kept() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/api/health")
        .header(header::COOKIE, "session-id=abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_consultation_missing_fields() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request("POST", "/api/consultations", r#"{"phone":"010-1234-5678"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("이름"));
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request("POST", "/api/registrations", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_admin_routes_require_login() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/api/admin/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "admin-1".to_string(),
        username: "admin01".to_string(),
        role: Role::Admin,
        name: "관리자".to_string(),
        iat: now - 7200,
        exp: now - 10,
    };
    let token = auth_service::encode_claims(&claims, JWT_SECRET).unwrap();

    let app = test_app().await;
    let response = app.oneshot(authed_get("/api/admin/users", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_checks() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(authed_get("/api/admin/users", &token_for(Role::Student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(authed_get("/api/admin/users", &token_for(Role::Teacher)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Parent routes are not part of the staff hierarchy.
    let response = app
        .oneshot(authed_get("/api/parent/students", &token_for(Role::Admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_passes_role_check() {
    let app = test_app().await;
    let request = Request::builder()
        .method("PATCH")
        .uri("/api/admin/students/s1/attendance")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(Role::Admin)))
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Reaches the handler, which rejects the empty edit.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = test_app().await;
    let response = app
        .oneshot(authed_get("/api/auth/me", &token_for(Role::Teacher)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "teacher");
    assert_eq!(body["data"]["id"], "teacher-1");
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = test_app().await;
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["retryAfter"].as_u64().unwrap() > 0);

    // Other tiers keep their own budget.
    let response = app
        .oneshot(json_request("POST", "/api/consultations", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cron_requires_secret() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/cron/collect-news").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/cron/collect-news")
        .header(header::AUTHORIZATION, "Bearer wrong-secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_prepare_validates_amount() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/payments/prepare",
            r#"{"orderName":"로봇 기초반 3월","amount":0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
