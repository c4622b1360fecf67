use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use mongodb::bson::{to_bson, Bson, Document};
use mongodb::Database;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{ensure_changes, ensure_deleted, not_found, set_text};
use crate::db::{
    entities::online_course::{Chapter, CourseSchedule, OnlineCourse},
    enums::{CourseStatus, Role},
    new_id,
    services::{course_service, student_service, user_service},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_published))
        .route("/courses/{id}", get(get_published))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_all).post(create_course))
        .route("/courses/{id}", get(get_any).put(update_course).delete(delete_course))
}

#[derive(Deserialize)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub teacher_id: Option<String>,
    pub schedule: Option<CourseSchedule>,
    pub chapters: Option<Vec<Chapter>>,
    pub capacity: Option<u32>,
    pub price: Option<i64>,
    pub status: Option<CourseStatus>,
}

/// Looks up the display name for a course owner. Only staff can own a course.
async fn resolve_teacher_name(db: &Database, teacher_id: &str) -> Result<String, AppError> {
    let teacher = user_service::find_by_id(db, teacher_id)
        .await?
        .filter(|user| matches!(user.role, Role::Teacher | Role::Admin))
        .ok_or_else(|| AppError::InvalidInput("담당 강사를 찾을 수 없습니다.".to_string()))?;
    Ok(teacher.name)
}

fn validate_price(price: i64) -> Result<i64, AppError> {
    if price < 0 {
        return Err(AppError::InvalidInput("수강료는 0원 이상이어야 합니다.".to_string()));
    }
    Ok(price)
}

async fn list_published(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CourseQuery>,
) -> Result<ApiResponse<Vec<OnlineCourse>>, AppError> {
    let courses = course_service::list(
        &app_state.db,
        Some(CourseStatus::Published),
        query.category.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok(courses))
}

async fn get_published(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<OnlineCourse>, AppError> {
    let course = course_service::find_by_id(&app_state.db, &id)
        .await?
        .filter(|course| course.status == CourseStatus::Published)
        .ok_or_else(|| not_found("강좌"))?;
    Ok(ApiResponse::ok(course))
}

async fn list_all(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CourseQuery>,
) -> Result<ApiResponse<Vec<OnlineCourse>>, AppError> {
    let courses = course_service::list(&app_state.db, query.status, query.category.as_deref()).await?;
    Ok(ApiResponse::ok(courses))
}

async fn get_any(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<OnlineCourse>, AppError> {
    let course = course_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("강좌"))?;
    Ok(ApiResponse::ok(course))
}

async fn create_course(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CourseRequest>,
) -> Result<(StatusCode, ApiResponse<OnlineCourse>), AppError> {
    let title = validation::required(payload.title.as_deref(), "강좌명", MAX_SHORT_TEXT)?;
    let description = validation::optional(payload.description.as_deref(), "설명", MAX_LONG_TEXT)?;
    let category = validation::required(payload.category.as_deref(), "분류", MAX_SHORT_TEXT)?;
    let level = validation::optional(payload.level.as_deref(), "난이도", MAX_SHORT_TEXT)?;
    let price = validate_price(payload.price.unwrap_or(0))?;
    let teacher_id = validation::optional(payload.teacher_id.as_deref(), "담당 강사", MAX_SHORT_TEXT)?;

    let teacher_name = match &teacher_id {
        Some(id) => Some(resolve_teacher_name(&app_state.db, id).await?),
        None => None,
    };

    let now = timestamp::now();
    let course = OnlineCourse {
        id: new_id(),
        title,
        description: description.unwrap_or_default(),
        category,
        level: level.unwrap_or_else(|| "beginner".to_string()),
        teacher_id,
        teacher_name,
        schedule: payload.schedule.unwrap_or_default(),
        chapters: payload.chapters.unwrap_or_default(),
        capacity: payload.capacity,
        price,
        status: payload.status.unwrap_or(CourseStatus::Draft),
        created_at: now,
        updated_at: now,
    };
    course_service::insert(&app_state.db, &course).await?;
    info!(course_id = %course.id, "Course created.");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(course, "강좌가 등록되었습니다."),
    ))
}

async fn update_course(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<CourseRequest>,
) -> Result<ApiResponse<OnlineCourse>, AppError> {
    let mut set = Document::new();
    set_text(&mut set, "title", payload.title.as_deref(), "강좌명", MAX_SHORT_TEXT)?;
    set_text(&mut set, "description", payload.description.as_deref(), "설명", MAX_LONG_TEXT)?;
    set_text(&mut set, "category", payload.category.as_deref(), "분류", MAX_SHORT_TEXT)?;
    set_text(&mut set, "level", payload.level.as_deref(), "난이도", MAX_SHORT_TEXT)?;
    if let Some(schedule) = &payload.schedule {
        set.insert("schedule", to_bson(schedule)?);
    }
    if let Some(chapters) = &payload.chapters {
        set.insert("chapters", to_bson(chapters)?);
    }
    if let Some(capacity) = payload.capacity {
        set.insert("capacity", capacity as i64);
    }
    if let Some(price) = payload.price {
        set.insert("price", validate_price(price)?);
    }
    if let Some(status) = payload.status {
        set.insert("status", status.as_str());
    }

    // An empty teacherId unassigns; a new one re-resolves the denormalized name.
    if let Some(raw) = payload.teacher_id.as_deref() {
        match validation::optional(Some(raw), "담당 강사", MAX_SHORT_TEXT)? {
            Some(teacher_id) => {
                let teacher_name = resolve_teacher_name(&app_state.db, &teacher_id).await?;
                set.insert("teacherId", teacher_id);
                set.insert("teacherName", teacher_name);
            }
            None => {
                set.insert("teacherId", Bson::Null);
                set.insert("teacherName", Bson::Null);
            }
        }
    }
    ensure_changes(&set)?;

    let course = course_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("강좌"))?;

    if payload.title.is_some() {
        let renamed = student_service::rename_enrolled_course(&app_state.db, &course.id, &course.title).await?;
        info!(course_id = %course.id, students = renamed, "Course title propagated to enrolments.");
    }
    Ok(ApiResponse::ok_with_message(course, "강좌가 수정되었습니다."))
}

async fn delete_course(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(course_service::delete(&app_state.db, &id).await?, "강좌")?;
    Ok(ApiResponse::message("강좌가 삭제되었습니다."))
}
