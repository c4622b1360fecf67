use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use mongodb::Database;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::collector::{naver::NaverNewsSource, NewsSource};
use crate::db::enums::Role;
use crate::notifications::service::NotificationService;
use crate::payments::{portone::PortOneClient, PaymentGateway};
use crate::server::config::ServerConfig;
use crate::version::VERSION;

pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod validation;

pub use error::AppError;

use middleware::{auth, rate_limit, rate_limit::RateLimiter, session};
use response::ApiResponse;
use routes::{
    auth_routes, collected_news_routes, consultation_routes, conversion_routes, course_routes,
    cron_routes, faq_routes, news_routes, newsletter_routes, parent_routes, payment_routes,
    popup_routes, registration_routes, student_routes, teacher_routes, upload_routes, user_routes,
};

pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub rate_limiter: Arc<RateLimiter>,
    pub notifications: Arc<NotificationService>,
    pub payments: Arc<dyn PaymentGateway>,
    /// `None` when no news API credentials are configured.
    pub news_source: Option<Arc<dyn NewsSource>>,
}

impl AppState {
    pub fn new(db: Database, config: Arc<ServerConfig>) -> Self {
        let news_source = NaverNewsSource::from_config(&config.news)
            .map(|source| Arc::new(source) as Arc<dyn NewsSource>);
        if news_source.is_none() {
            warn!("Naver API credentials missing; news collection is disabled.");
        }
        AppState {
            notifications: Arc::new(NotificationService::from_config(&config)),
            payments: Arc::new(PortOneClient::new(&config.payment)),
            rate_limiter: Arc::new(RateLimiter::new()),
            news_source,
            db,
            config,
        }
    }
}

async fn health() -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(serde_json::json!({ "status": "ok", "version": VERSION }))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match frontend_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            warn!(frontend_url, error = %e, "Invalid FRONTEND_URL; cross-origin requests are refused.");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let authenticated = from_fn_with_state(app_state.clone(), auth::auth);
    let default_tier = from_fn_with_state(app_state.clone(), rate_limit::default);

    let strict = auth_routes::create_login_router()
        .route_layer(from_fn_with_state(app_state.clone(), rate_limit::strict));

    let moderate = Router::new()
        .merge(consultation_routes::create_public_router())
        .merge(registration_routes::create_public_router())
        .merge(newsletter_routes::create_subscribe_router())
        .merge(payment_routes::create_confirm_router())
        .route_layer(from_fn_with_state(app_state.clone(), rate_limit::moderate));

    let public = Router::new()
        .route("/health", get(health))
        .merge(auth_routes::create_session_router(app_state.clone()))
        .merge(news_routes::create_public_router())
        .merge(course_routes::create_public_router())
        .merge(faq_routes::create_public_router())
        .merge(popup_routes::create_public_router())
        .merge(newsletter_routes::create_public_router())
        .merge(conversion_routes::create_public_router())
        .merge(payment_routes::create_public_router())
        .merge(cron_routes::create_cron_router())
        .route_layer(default_tier.clone());

    let admin = Router::new()
        .merge(user_routes::create_admin_router())
        .merge(student_routes::create_admin_router())
        .merge(course_routes::create_admin_router())
        .merge(news_routes::create_admin_router())
        .merge(faq_routes::create_admin_router())
        .merge(newsletter_routes::create_admin_router())
        .merge(consultation_routes::create_admin_router())
        .merge(registration_routes::create_admin_router())
        .merge(payment_routes::create_admin_router())
        .merge(popup_routes::create_admin_router())
        .merge(conversion_routes::create_admin_router())
        .merge(collected_news_routes::create_admin_router())
        .merge(upload_routes::create_admin_router())
        .route_layer(from_fn(auth::require_role(Role::Admin)))
        .route_layer(authenticated.clone())
        .route_layer(default_tier.clone());

    let teacher = teacher_routes::create_teacher_router()
        .route_layer(from_fn(auth::require_role(Role::Teacher)))
        .route_layer(authenticated.clone())
        .route_layer(default_tier.clone());

    let parent = parent_routes::create_parent_router()
        .route_layer(from_fn(auth::require_role(Role::Parent)))
        .route_layer(authenticated)
        .route_layer(default_tier);

    let api = Router::new()
        .merge(strict)
        .merge(moderate)
        .merge(public)
        .nest("/admin", admin)
        .nest("/teacher", teacher)
        .nest("/parent", parent);

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&app_state.config.upload_dir))
        .layer(from_fn_with_state(app_state.clone(), session::session))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&app_state.config.frontend_url))
        .with_state(app_state)
}
