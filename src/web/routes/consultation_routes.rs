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

use super::{ensure_changes, ensure_deleted, not_found, set_optional_text};
use crate::db::{
    entities::consultation::Consultation,
    enums::ConsultationStatus,
    new_id,
    services::{consultation_service, PageRequest},
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
    Router::new().route("/consultations", post(create_consultation))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consultations", get(list_consultations))
        .route(
            "/consultations/{id}",
            get(get_consultation)
                .patch(update_consultation)
                .delete(delete_consultation),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub child_age: Option<u32>,
    pub interest: Option<String>,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
}

#[derive(Deserialize)]
pub struct ConsultationQuery {
    pub status: Option<ConsultationStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub(crate) fn check_child_age(age: Option<u32>) -> Result<Option<u32>, AppError> {
    match age {
        Some(age) if !(1..=19).contains(&age) => Err(AppError::InvalidInput(
            "나이를 올바르게 입력해주세요.".to_string(),
        )),
        other => Ok(other),
    }
}

/// Validates and sanitizes a public consultation form.
pub fn build_consultation(payload: ConsultationRequest) -> Result<Consultation, AppError> {
    let now = timestamp::now();
    Ok(Consultation {
        id: new_id(),
        name: validation::required(payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?,
        phone: validation::required_phone(payload.phone.as_deref(), "연락처")?,
        email: validation::optional_email(payload.email.as_deref())?,
        child_age: check_child_age(payload.child_age)?,
        interest: validation::required(payload.interest.as_deref(), "관심 분야", MAX_SHORT_TEXT)?,
        message: validation::optional(payload.message.as_deref(), "문의 내용", MAX_LONG_TEXT)?,
        preferred_date: validation::optional(payload.preferred_date.as_deref(), "희망 일정", MAX_SHORT_TEXT)?,
        status: ConsultationStatus::Pending,
        admin_memo: None,
        created_at: now,
        updated_at: now,
    })
}

async fn create_consultation(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ConsultationRequest>,
) -> Result<(StatusCode, NotifiedResponse<Consultation>), AppError> {
    let consultation = build_consultation(payload)?;
    consultation_service::insert(&app_state.db, &consultation).await?;
    info!(consultation_id = %consultation.id, "Consultation request stored.");

    let report = app_state
        .notifications
        .notify_admin_new_consultation(&consultation)
        .await;
    Ok((
        StatusCode::CREATED,
        NotifiedResponse::new(consultation, "상담 신청이 접수되었습니다.", report),
    ))
}

async fn list_consultations(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ConsultationQuery>,
) -> Result<ApiResponse<Paginated<Consultation>>, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = consultation_service::list(&app_state.db, query.status, page).await?;
    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

async fn get_consultation(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Consultation>, AppError> {
    let consultation = consultation_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("상담 신청"))?;
    Ok(ApiResponse::ok(consultation))
}

async fn update_consultation(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<LeadUpdateRequest<ConsultationStatus>>,
) -> Result<ApiResponse<Consultation>, AppError> {
    let mut set = Document::new();
    if let Some(status) = payload.status {
        set.insert("status", status.as_str());
    }
    set_optional_text(&mut set, "adminMemo", payload.admin_memo.as_deref(), "메모", MAX_LONG_TEXT)?;
    ensure_changes(&set)?;

    let consultation = consultation_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("상담 신청"))?;
    Ok(ApiResponse::ok(consultation))
}

async fn delete_consultation(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(consultation_service::delete(&app_state.db, &id).await?, "상담 신청")?;
    Ok(ApiResponse::message("상담 신청이 삭제되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConsultationRequest {
        ConsultationRequest {
            name: Some(" 김하늘 ".to_string()),
            phone: Some("01012345678".to_string()),
            email: Some("Parent@Example.com".to_string()),
            child_age: Some(9),
            interest: Some("로봇 코딩".to_string()),
            message: None,
            preferred_date: Some("".to_string()),
        }
    }

    #[test]
    fn test_stored_fields_are_sanitized_input() {
        let consultation = build_consultation(request()).unwrap();
        assert_eq!(consultation.name, "김하늘");
        assert_eq!(consultation.phone, "010-1234-5678");
        assert_eq!(consultation.email.as_deref(), Some("parent@example.com"));
        assert_eq!(consultation.interest, "로봇 코딩");
        assert_eq!(consultation.preferred_date, None);
        assert_eq!(consultation.status, ConsultationStatus::Pending);
    }

    #[test]
    fn test_missing_required_fields() {
        for strip in ["name", "phone", "interest"] {
            let mut payload = request();
            match strip {
                "name" => payload.name = None,
                "phone" => payload.phone = Some("  ".to_string()),
                _ => payload.interest = None,
            }
            assert!(matches!(
                build_consultation(payload),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_rejects_bad_phone_and_age() {
        let mut payload = request();
        payload.phone = Some("12345".to_string());
        assert!(build_consultation(payload).is_err());

        let mut payload = request();
        payload.child_age = Some(0);
        assert!(build_consultation(payload).is_err());
    }
}
