use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use mongodb::bson::Document;
use serde::Deserialize;
use std::sync::Arc;

use super::{ensure_changes, ensure_deleted, not_found, set_optional_text, set_text};
use crate::db::{
    entities::news::News,
    enums::NewsCategory,
    new_id,
    services::{news_service, PageRequest},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    models::AuthenticatedUser,
    response::{ApiResponse, Paginated},
    validation::{self, MAX_CONTENT, MAX_SHORT_TEXT},
    AppState,
};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/news", get(list_published))
        .route("/news/{id}", get(get_published))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/news", get(list_all).post(create_news))
        .route("/news/{id}", get(get_any).put(update_news).delete(delete_news))
}

#[derive(Deserialize)]
pub struct NewsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<NewsCategory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<NewsCategory>,
    pub thumbnail: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<NewsCategory>,
    pub thumbnail: Option<String>,
    pub is_published: Option<bool>,
}

async fn list_news(
    app_state: &AppState,
    published_only: bool,
    query: NewsQuery,
) -> Result<ApiResponse<Paginated<News>>, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = news_service::list(&app_state.db, published_only, query.category, page).await?;
    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

async fn list_published(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<ApiResponse<Paginated<News>>, AppError> {
    list_news(&app_state, true, query).await
}

async fn list_all(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<ApiResponse<Paginated<News>>, AppError> {
    list_news(&app_state, false, query).await
}

async fn get_published(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<News>, AppError> {
    let article = news_service::view_published(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("소식"))?;
    Ok(ApiResponse::ok(article))
}

async fn get_any(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<News>, AppError> {
    let article = news_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("소식"))?;
    Ok(ApiResponse::ok(article))
}

async fn create_news(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateNewsRequest>,
) -> Result<(StatusCode, ApiResponse<News>), AppError> {
    let now = timestamp::now();
    let article = News {
        id: new_id(),
        title: validation::required(payload.title.as_deref(), "제목", MAX_SHORT_TEXT * 2)?,
        content: validation::required(payload.content.as_deref(), "내용", MAX_CONTENT)?,
        category: payload.category.unwrap_or(NewsCategory::Notice),
        author_id: auth_user.id,
        author_name: auth_user.name,
        thumbnail: validation::optional(payload.thumbnail.as_deref(), "썸네일", 500)?,
        is_published: payload.is_published.unwrap_or(false),
        views: 0,
        created_at: now,
        updated_at: now,
    };
    news_service::insert(&app_state.db, &article).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(article, "소식이 등록되었습니다."),
    ))
}

async fn update_news(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateNewsRequest>,
) -> Result<ApiResponse<News>, AppError> {
    let mut set = Document::new();
    set_text(&mut set, "title", payload.title.as_deref(), "제목", MAX_SHORT_TEXT * 2)?;
    set_text(&mut set, "content", payload.content.as_deref(), "내용", MAX_CONTENT)?;
    set_optional_text(&mut set, "thumbnail", payload.thumbnail.as_deref(), "썸네일", 500)?;
    if let Some(category) = payload.category {
        set.insert("category", category.as_str());
    }
    if let Some(is_published) = payload.is_published {
        set.insert("isPublished", is_published);
    }
    ensure_changes(&set)?;
    // The editor becomes the displayed author.
    set.insert("authorId", auth_user.id.as_str());
    set.insert("authorName", auth_user.name.as_str());

    let article = news_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("소식"))?;
    Ok(ApiResponse::ok_with_message(article, "소식이 수정되었습니다."))
}

async fn delete_news(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(news_service::delete(&app_state.db, &id).await?, "소식")?;
    Ok(ApiResponse::message("소식이 삭제되었습니다."))
}
