use axum::{extract::State, http::HeaderMap, routing::get, Router};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collector::collection_service;
use crate::db::entities::collected_news::NewsCollectionLog;
use crate::web::{error::AppError, middleware::auth::bearer_token, response::ApiResponse, AppState};

pub fn create_cron_router() -> Router<Arc<AppState>> {
    Router::new().route("/cron/collect-news", get(collect_news).post(collect_news))
}

/// Compares without short-circuiting on the first differing byte.
fn secrets_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// A request is authorized only when a cron secret is configured and presented.
pub fn is_authorized(headers: &HeaderMap, cron_secret: Option<&str>) -> bool {
    match (bearer_token(headers), cron_secret) {
        (Some(given), Some(expected)) => secrets_match(given, expected),
        _ => false,
    }
}

/// Runs one collection pass with the configured source and keywords.
pub(crate) async fn collect_now(app_state: &AppState) -> Result<NewsCollectionLog, AppError> {
    let source = app_state.news_source.as_deref().ok_or_else(|| {
        AppError::InternalServerError("news source credentials are not configured".to_string())
    })?;
    collection_service::run_collection(&app_state.db, source, &app_state.config.news.keywords).await
}

async fn collect_news(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<ApiResponse<NewsCollectionLog>, AppError> {
    if !is_authorized(&headers, app_state.config.cron_secret.as_deref()) {
        warn!("Rejected news collection trigger.");
        return Err(AppError::Unauthorized("인증되지 않은 요청입니다.".to_string()));
    }
    let log = collect_now(&app_state).await?;
    info!(inserted = log.inserted, "News collection triggered by cron.");
    Ok(ApiResponse::ok(log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_cron_secret_check() {
        assert!(is_authorized(&headers("Bearer s3cret"), Some("s3cret")));
        assert!(!is_authorized(&headers("Bearer s3cre7"), Some("s3cret")));
        assert!(!is_authorized(&headers("Bearer s3cret"), None));
        assert!(!is_authorized(&HeaderMap::new(), Some("s3cret")));
        assert!(!is_authorized(&headers("s3cret"), Some("s3cret")));
    }
}
