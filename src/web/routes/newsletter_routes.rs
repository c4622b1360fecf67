use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{ensure_deleted, not_found};
use crate::db::{
    entities::newsletter::{Newsletter, NewsletterSubscriber},
    enums::NewsletterStatus,
    new_id,
    services::newsletter_service::{self, SubscribeOutcome},
    timestamp,
};
use crate::notifications::service::NewsletterReport;
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    validation::{self, MAX_CONTENT, MAX_SHORT_TEXT},
    AppState,
};

/// Mounted behind the moderate rate tier.
pub fn create_subscribe_router() -> Router<Arc<AppState>> {
    Router::new().route("/newsletter/subscribe", post(subscribe))
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/newsletter/unsubscribe", post(unsubscribe))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/newsletters", get(list_newsletters).post(create_draft))
        .route("/newsletters/subscribers", get(list_subscribers))
        .route("/newsletters/{id}", get(get_newsletter).delete(delete_newsletter))
        .route("/newsletters/{id}/send", post(send_newsletter))
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct UnsubscribeRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct SubscriberQuery {
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct DraftRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize)]
pub struct SendResult {
    pub newsletter: Newsletter,
    pub report: NewsletterReport,
}

async fn subscribe(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<SubscribeRequest>,
) -> Result<(StatusCode, ApiResponse<NewsletterSubscriber>), AppError> {
    let email = validation::required_email(payload.email.as_deref())?;
    let name = validation::optional(payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?;

    match newsletter_service::subscribe(&app_state.db, &email, name).await? {
        SubscribeOutcome::Created(subscriber) => Ok((
            StatusCode::CREATED,
            ApiResponse::ok_with_message(subscriber, "뉴스레터 구독이 완료되었습니다."),
        )),
        SubscribeOutcome::Reactivated(subscriber) => Ok((
            StatusCode::OK,
            ApiResponse::ok_with_message(subscriber, "뉴스레터 구독이 다시 시작되었습니다."),
        )),
        SubscribeOutcome::AlreadyActive => Err(AppError::Conflict(
            "이미 구독 중인 이메일입니다.".to_string(),
        )),
    }
}

async fn unsubscribe(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<UnsubscribeRequest>,
) -> Result<ApiResponse<()>, AppError> {
    let email = validation::required_email(payload.email.as_deref())?;
    // Same answer whether or not the address was subscribed.
    let switched_off = newsletter_service::unsubscribe(&app_state.db, &email).await?;
    info!(switched_off, "Newsletter unsubscribe processed.");
    Ok(ApiResponse::message("구독이 해지되었습니다."))
}

async fn list_subscribers(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<SubscriberQuery>,
) -> Result<ApiResponse<Vec<NewsletterSubscriber>>, AppError> {
    let subscribers =
        newsletter_service::list_subscribers(&app_state.db, query.active.unwrap_or(false)).await?;
    Ok(ApiResponse::ok(subscribers))
}

async fn list_newsletters(
    State(app_state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<Newsletter>>, AppError> {
    Ok(ApiResponse::ok(newsletter_service::list_newsletters(&app_state.db).await?))
}

async fn get_newsletter(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Newsletter>, AppError> {
    let newsletter = newsletter_service::find_newsletter(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("뉴스레터"))?;
    Ok(ApiResponse::ok(newsletter))
}

async fn create_draft(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<DraftRequest>,
) -> Result<(StatusCode, ApiResponse<Newsletter>), AppError> {
    let now = timestamp::now();
    let newsletter = Newsletter {
        id: new_id(),
        title: validation::required(payload.title.as_deref(), "제목", MAX_SHORT_TEXT * 2)?,
        content: validation::required(payload.content.as_deref(), "내용", MAX_CONTENT)?,
        status: NewsletterStatus::Draft,
        sent_at: None,
        recipient_count: 0,
        created_at: now,
        updated_at: now,
    };
    newsletter_service::insert_newsletter(&app_state.db, &newsletter).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(newsletter)))
}

fn check_sendable(status: NewsletterStatus) -> Result<(), AppError> {
    match status {
        NewsletterStatus::Draft => Ok(()),
        NewsletterStatus::Sending => Err(AppError::Conflict("발송 중인 뉴스레터입니다.".to_string())),
        NewsletterStatus::Sent => Err(AppError::Conflict("이미 발송된 뉴스레터입니다.".to_string())),
    }
}

/// A dispatch that reached nobody leaves the newsletter a draft so it can be retried.
fn status_after_dispatch(report: &NewsletterReport) -> NewsletterStatus {
    if report.delivered > 0 {
        NewsletterStatus::Sent
    } else {
        NewsletterStatus::Draft
    }
}

async fn send_newsletter(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<SendResult>, AppError> {
    let newsletter = newsletter_service::find_newsletter(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("뉴스레터"))?;
    check_sendable(newsletter.status)?;
    if !app_state.notifications.can_send_email() {
        return Err(AppError::InvalidInput(
            "이메일 발송 설정이 되어 있지 않습니다.".to_string(),
        ));
    }

    let subscribers = newsletter_service::list_subscribers(&app_state.db, true).await?;
    if subscribers.is_empty() {
        return Err(AppError::InvalidInput("발송할 구독자가 없습니다.".to_string()));
    }

    let newsletter = newsletter_service::claim_draft(&app_state.db, &id)
        .await?
        .ok_or_else(|| AppError::Conflict("이미 발송 중이거나 발송된 뉴스레터입니다.".to_string()))?;
    let report = app_state
        .notifications
        .send_newsletter(&newsletter, &subscribers)
        .await;

    match status_after_dispatch(&report) {
        NewsletterStatus::Sent => {
            let newsletter = newsletter_service::mark_sent(&app_state.db, &id, report.delivered)
                .await?
                .ok_or_else(|| AppError::Conflict("뉴스레터 상태가 변경되었습니다.".to_string()))?;
            Ok(ApiResponse::ok_with_message(
                SendResult { newsletter, report },
                format!("{}명에게 발송되었습니다.", report.delivered),
            ))
        }
        _ => {
            newsletter_service::release_claim(&app_state.db, &id).await?;
            warn!(newsletter_id = %id, failed = report.failed, "Newsletter reached no subscriber; kept as draft.");
            Err(AppError::UpstreamError(
                "뉴스레터 발송에 실패했습니다. 잠시 후 다시 시도해주세요.".to_string(),
            ))
        }
    }
}

async fn delete_newsletter(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(newsletter_service::delete_newsletter(&app_state.db, &id).await?, "뉴스레터")?;
    Ok(ApiResponse::message("뉴스레터가 삭제되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_drafts_are_sendable() {
        assert!(check_sendable(NewsletterStatus::Draft).is_ok());
        assert!(matches!(check_sendable(NewsletterStatus::Sending), Err(AppError::Conflict(_))));
        assert!(matches!(check_sendable(NewsletterStatus::Sent), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_failed_dispatch_stays_draft() {
        let all_failed = NewsletterReport {
            recipients: 3,
            delivered: 0,
            failed: 3,
        };
        assert_eq!(status_after_dispatch(&all_failed), NewsletterStatus::Draft);

        let partial = NewsletterReport {
            recipients: 3,
            delivered: 1,
            failed: 2,
        };
        assert_eq!(status_after_dispatch(&partial), NewsletterStatus::Sent);
    }
}
