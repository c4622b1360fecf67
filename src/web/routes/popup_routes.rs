use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Document};
use serde::Deserialize;
use std::sync::Arc;

use super::{ensure_changes, ensure_deleted, not_found, set_optional_text, set_text};
use crate::db::{
    entities::popup::{DisplayRule, Popup},
    new_id,
    services::popup_service,
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

const MAX_URL: usize = 500;

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/popups/active", get(list_active))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/popups", get(list_all).post(create_popup))
        .route("/popups/{id}", get(get_popup).put(update_popup).delete(delete_popup))
}

#[derive(Deserialize)]
pub struct ActiveQuery {
    /// Current page path; popups scoped to other pages are left out.
    pub page: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub display_rule: Option<DisplayRule>,
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::InvalidInput(
            "종료일은 시작일 이후여야 합니다.".to_string(),
        ));
    }
    Ok(())
}

async fn list_active(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<ApiResponse<Vec<Popup>>, AppError> {
    let popups = popup_service::list_active(&app_state.db).await?;
    let popups = match query.page.as_deref() {
        Some(page) => popups.into_iter().filter(|p| p.shows_on(page)).collect(),
        None => popups,
    };
    Ok(ApiResponse::ok(popups))
}

async fn list_all(State(app_state): State<Arc<AppState>>) -> Result<ApiResponse<Vec<Popup>>, AppError> {
    Ok(ApiResponse::ok(popup_service::list_all(&app_state.db).await?))
}

async fn get_popup(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Popup>, AppError> {
    let popup = popup_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("팝업"))?;
    Ok(ApiResponse::ok(popup))
}

async fn create_popup(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<PopupRequest>,
) -> Result<(StatusCode, ApiResponse<Popup>), AppError> {
    let title = validation::required(payload.title.as_deref(), "제목", MAX_SHORT_TEXT)?;
    let (Some(start_date), Some(end_date)) = (payload.start_date, payload.end_date) else {
        return Err(AppError::InvalidInput("게시 기간을 입력해주세요.".to_string()));
    };
    check_window(start_date, end_date)?;

    let now = timestamp::now();
    let popup = Popup {
        id: new_id(),
        title,
        content: validation::optional(payload.content.as_deref(), "내용", MAX_LONG_TEXT)?,
        image_url: validation::optional(payload.image_url.as_deref(), "이미지", MAX_URL)?,
        link_url: validation::optional(payload.link_url.as_deref(), "링크", MAX_URL)?,
        start_date,
        end_date,
        is_active: payload.is_active.unwrap_or(true),
        priority: payload.priority.unwrap_or(0),
        display_rule: payload.display_rule.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };
    popup_service::insert(&app_state.db, &popup).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(popup)))
}

async fn update_popup(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<PopupRequest>,
) -> Result<ApiResponse<Popup>, AppError> {
    let mut set = Document::new();
    set_text(&mut set, "title", payload.title.as_deref(), "제목", MAX_SHORT_TEXT)?;
    set_optional_text(&mut set, "content", payload.content.as_deref(), "내용", MAX_LONG_TEXT)?;
    set_optional_text(&mut set, "imageUrl", payload.image_url.as_deref(), "이미지", MAX_URL)?;
    set_optional_text(&mut set, "linkUrl", payload.link_url.as_deref(), "링크", MAX_URL)?;
    if let Some(is_active) = payload.is_active {
        set.insert("isActive", is_active);
    }
    if let Some(priority) = payload.priority {
        set.insert("priority", priority);
    }
    if let Some(rule) = &payload.display_rule {
        set.insert("displayRule", to_bson(rule)?);
    }

    if payload.start_date.is_some() || payload.end_date.is_some() {
        let current = popup_service::find_by_id(&app_state.db, &id)
            .await?
            .ok_or_else(|| not_found("팝업"))?;
        let start = payload.start_date.unwrap_or(current.start_date);
        let end = payload.end_date.unwrap_or(current.end_date);
        check_window(start, end)?;
        set.insert("startDate", timestamp::format(&start));
        set.insert("endDate", timestamp::format(&end));
    }
    ensure_changes(&set)?;

    let popup = popup_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("팝업"))?;
    Ok(ApiResponse::ok(popup))
}

async fn delete_popup(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(popup_service::delete(&app_state.db, &id).await?, "팝업")?;
    Ok(ApiResponse::message("팝업이 삭제되었습니다."))
}
