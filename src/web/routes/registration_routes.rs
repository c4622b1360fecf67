use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use mongodb::bson::Document;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{consultation_routes::check_child_age, ensure_changes, ensure_deleted, not_found, set_optional_text};
use crate::db::{
    entities::registration::Registration,
    enums::{PaymentStatus, RegistrationStatus},
    new_id,
    services::{registration_service, PageRequest},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    models::LeadUpdateRequest,
    response::{ApiResponse, NotifiedResponse, Paginated},
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

/// Mounted behind the moderate rate tier.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/registrations", post(create_registration))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/registrations", get(list_registrations))
        .route(
            "/registrations/{id}",
            get(get_registration)
                .patch(update_registration)
                .delete(delete_registration),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub program_id: Option<String>,
    pub program_name: Option<String>,
    pub student_name: Option<String>,
    pub student_age: Option<u32>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationQuery {
    pub status: Option<RegistrationStatus>,
    pub program_id: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn build_registration(payload: RegistrationRequest) -> Result<Registration, AppError> {
    let now = timestamp::now();
    Ok(Registration {
        id: new_id(),
        program_id: validation::required(payload.program_id.as_deref(), "프로그램", MAX_SHORT_TEXT)?,
        program_name: validation::required(payload.program_name.as_deref(), "프로그램명", MAX_SHORT_TEXT)?,
        student_name: validation::required(payload.student_name.as_deref(), "학생 이름", MAX_SHORT_TEXT)?,
        student_age: check_child_age(payload.student_age)?,
        parent_name: validation::required(payload.parent_name.as_deref(), "보호자 이름", MAX_SHORT_TEXT)?,
        parent_phone: validation::required_phone(payload.parent_phone.as_deref(), "보호자 연락처")?,
        email: validation::optional_email(payload.email.as_deref())?,
        message: validation::optional(payload.message.as_deref(), "요청 사항", MAX_LONG_TEXT)?,
        status: RegistrationStatus::Pending,
        payment_status: PaymentStatus::Ready,
        admin_memo: None,
        created_at: now,
        updated_at: now,
    })
}

async fn create_registration(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegistrationRequest>,
) -> Result<(StatusCode, NotifiedResponse<Registration>), AppError> {
    let registration = build_registration(payload)?;
    registration_service::insert(&app_state.db, &registration).await?;
    info!(registration_id = %registration.id, program_id = %registration.program_id, "Registration stored.");

    let report = app_state
        .notifications
        .notify_admin_new_registration(&registration)
        .await;
    Ok((
        StatusCode::CREATED,
        NotifiedResponse::new(registration, "수강 신청이 접수되었습니다.", report),
    ))
}

async fn list_registrations(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RegistrationQuery>,
) -> Result<ApiResponse<Paginated<Registration>>, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = registration_service::list(
        &app_state.db,
        query.status,
        query.program_id.as_deref(),
        page,
    )
    .await?;
    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

async fn get_registration(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Registration>, AppError> {
    let registration = registration_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("수강 신청"))?;
    Ok(ApiResponse::ok(registration))
}

async fn update_registration(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<LeadUpdateRequest<RegistrationStatus>>,
) -> Result<ApiResponse<Registration>, AppError> {
    let mut set = Document::new();
    if let Some(status) = payload.status {
        set.insert("status", status.as_str());
    }
    set_optional_text(&mut set, "adminMemo", payload.admin_memo.as_deref(), "메모", MAX_LONG_TEXT)?;
    ensure_changes(&set)?;

    let registration = registration_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("수강 신청"))?;
    Ok(ApiResponse::ok(registration))
}

async fn delete_registration(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(registration_service::delete(&app_state.db, &id).await?, "수강 신청")?;
    Ok(ApiResponse::message("수강 신청이 삭제되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_is_pending_and_unpaid() {
        let registration = build_registration(RegistrationRequest {
            program_id: Some("prog-1".to_string()),
            program_name: Some("로봇 기초반".to_string()),
            student_name: Some("이도윤".to_string()),
            student_age: Some(10),
            parent_name: Some("이지현".to_string()),
            parent_phone: Some("010 9876 5432".to_string()),
            email: None,
            message: None,
        })
        .unwrap();
        assert_eq!(registration.parent_phone, "010-9876-5432");
        assert_eq!(registration.status, RegistrationStatus::Pending);
        assert_eq!(registration.payment_status, PaymentStatus::Ready);
    }

    #[test]
    fn test_missing_parent_phone() {
        let result = build_registration(RegistrationRequest {
            program_id: Some("prog-1".to_string()),
            program_name: Some("로봇 기초반".to_string()),
            student_name: Some("이도윤".to_string()),
            student_age: None,
            parent_name: Some("이지현".to_string()),
            parent_phone: None,
            email: None,
            message: None,
        });
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
