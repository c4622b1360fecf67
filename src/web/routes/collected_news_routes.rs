use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{cron_routes::collect_now, ensure_deleted};
use crate::collector::{collection_service::build_article, RawArticle};
use crate::db::{
    entities::collected_news::{CollectedNewsArticle, NewsCollectionLog},
    services::{collected_news_service, PageRequest},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::{ApiResponse, Paginated},
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

const RECENT_LOG_LIMIT: i64 = 20;
const MAX_URL_LEN: usize = 2_000;

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/collected-news", get(list_articles).post(submit_article))
        .route("/collected-news/logs", get(list_logs))
        .route("/collected-news/collect", post(run_now))
        .route("/collected-news/{id}", delete(delete_article))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    pub keyword: Option<String>,
    pub min_score: Option<u32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub keyword: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SubmitResult {
    pub created: bool,
    pub article: CollectedNewsArticle,
}

fn check_url(url: &str) -> Result<(), AppError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::InvalidInput("기사 주소를 확인해주세요.".to_string()));
    }
    Ok(())
}

/// Cleans and scores a manually submitted article the same way as collected ones.
pub fn build_submission(payload: SubmitRequest) -> Result<CollectedNewsArticle, AppError> {
    let url = validation::required(payload.url.as_deref(), "기사 주소", MAX_URL_LEN)?;
    check_url(&url)?;
    let raw = RawArticle {
        title: validation::required(payload.title.as_deref(), "제목", MAX_SHORT_TEXT * 3)?,
        description: validation::optional(payload.description.as_deref(), "요약", MAX_LONG_TEXT)?
            .unwrap_or_default(),
        url,
        published_at: payload.published_at,
    };
    let keyword = validation::required(payload.keyword.as_deref(), "키워드", MAX_SHORT_TEXT)?;
    let source = validation::optional(payload.source.as_deref(), "출처", MAX_SHORT_TEXT)?;
    Ok(build_article(raw, &keyword, source, timestamp::now()))
}

async fn list_articles(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<ApiResponse<Paginated<CollectedNewsArticle>>, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let keyword = validation::optional(query.keyword.as_deref(), "키워드", MAX_SHORT_TEXT)?;
    let (items, total) =
        collected_news_service::list(&app_state.db, keyword.as_deref(), query.min_score, page).await?;
    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

async fn submit_article(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<(StatusCode, ApiResponse<SubmitResult>), AppError> {
    let article = build_submission(payload)?;
    let created = collected_news_service::insert_if_new(&app_state.db, &article).await?;
    info!(url = %article.url, created, "Manual article submitted.");

    let (status, message) = if created {
        (StatusCode::CREATED, "기사가 등록되었습니다.")
    } else {
        (StatusCode::OK, "이미 수집된 기사입니다.")
    };
    Ok((
        status,
        ApiResponse::ok_with_message(SubmitResult { created, article }, message),
    ))
}

async fn list_logs(
    State(app_state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<NewsCollectionLog>>, AppError> {
    let logs = collected_news_service::recent_logs(&app_state.db, RECENT_LOG_LIMIT).await?;
    Ok(ApiResponse::ok(logs))
}

async fn run_now(
    State(app_state): State<Arc<AppState>>,
) -> Result<ApiResponse<NewsCollectionLog>, AppError> {
    let log = collect_now(&app_state).await?;
    Ok(ApiResponse::ok_with_message(
        log,
        "뉴스 수집이 완료되었습니다.",
    ))
}

async fn delete_article(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(collected_news_service::delete(&app_state.db, &id).await?, "기사")?;
    Ok(ApiResponse::message("기사가 삭제되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmitRequest {
        SubmitRequest {
            title: Some("<b>코딩교육</b> 확대 &amp; 지원".to_string()),
            description: Some("초등 코딩교육 예산 증액".to_string()),
            url: Some(" https://www.example.kr/news/1 ".to_string()),
            keyword: Some("코딩교육".to_string()),
            source: None,
            published_at: None,
        }
    }

    #[test]
    fn test_submission_is_cleaned_and_scored() {
        let article = build_submission(request()).unwrap();
        assert_eq!(article.title, "코딩교육 확대 & 지원");
        assert_eq!(article.url, "https://www.example.kr/news/1");
        assert_eq!(article.source, "example.kr");
        assert_eq!(article.relevance_score, 100);
    }

    #[test]
    fn test_submission_requires_http_url() {
        let mut payload = request();
        payload.url = Some("javascript:alert(1)".to_string());
        assert!(matches!(build_submission(payload), Err(AppError::InvalidInput(_))));

        let mut payload = request();
        payload.keyword = None;
        assert!(build_submission(payload).is_err());
    }
}
