use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Router,
};
use mongodb::bson::Document;
use serde::Deserialize;
use std::sync::Arc;

use super::{ensure_changes, ensure_deleted, not_found, set_text};
use crate::db::{entities::faq::Faq, new_id, services::faq_service, timestamp};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/faqs", get(list_published))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/faqs", get(list_all).post(create_faq))
        .route("/faqs/{id}", put(update_faq).delete(delete_faq))
}

#[derive(Deserialize)]
pub struct FaqQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub order: Option<i32>,
    pub is_published: Option<bool>,
}

async fn list_published(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FaqQuery>,
) -> Result<ApiResponse<Vec<Faq>>, AppError> {
    let faqs = faq_service::list(&app_state.db, true, query.category.as_deref()).await?;
    Ok(ApiResponse::ok(faqs))
}

async fn list_all(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FaqQuery>,
) -> Result<ApiResponse<Vec<Faq>>, AppError> {
    let faqs = faq_service::list(&app_state.db, false, query.category.as_deref()).await?;
    Ok(ApiResponse::ok(faqs))
}

async fn create_faq(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<FaqRequest>,
) -> Result<(StatusCode, ApiResponse<Faq>), AppError> {
    let now = timestamp::now();
    let faq = Faq {
        id: new_id(),
        question: validation::required(payload.question.as_deref(), "질문", MAX_SHORT_TEXT * 5)?,
        answer: validation::required(payload.answer.as_deref(), "답변", MAX_LONG_TEXT)?,
        category: validation::optional(payload.category.as_deref(), "분류", MAX_SHORT_TEXT)?
            .unwrap_or_else(|| "general".to_string()),
        order: payload.order.unwrap_or(0),
        is_published: payload.is_published.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    faq_service::insert(&app_state.db, &faq).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(faq)))
}

async fn update_faq(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<FaqRequest>,
) -> Result<ApiResponse<Faq>, AppError> {
    let mut set = Document::new();
    set_text(&mut set, "question", payload.question.as_deref(), "질문", MAX_SHORT_TEXT * 5)?;
    set_text(&mut set, "answer", payload.answer.as_deref(), "답변", MAX_LONG_TEXT)?;
    set_text(&mut set, "category", payload.category.as_deref(), "분류", MAX_SHORT_TEXT)?;
    if let Some(order) = payload.order {
        set.insert("order", order);
    }
    if let Some(is_published) = payload.is_published {
        set.insert("isPublished", is_published);
    }
    ensure_changes(&set)?;

    let faq = faq_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("FAQ"))?;
    Ok(ApiResponse::ok(faq))
}

async fn delete_faq(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(faq_service::delete(&app_state.db, &id).await?, "FAQ")?;
    Ok(ApiResponse::message("FAQ가 삭제되었습니다."))
}
