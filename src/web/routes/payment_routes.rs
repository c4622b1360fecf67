use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::not_found;
use crate::db::{
    entities::payment::Payment,
    enums::PaymentStatus,
    new_id,
    services::{payment_service, registration_service, PageRequest},
    timestamp,
};
use crate::payments::{self, ProviderPayment, Verification};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::{ApiResponse, Paginated},
    validation::{self, MAX_SHORT_TEXT},
    AppState,
};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/payments/prepare", post(prepare_payment))
}

/// Mounted behind the moderate rate tier.
pub fn create_confirm_router() -> Router<Arc<AppState>> {
    Router::new().route("/payments/confirm", post(confirm_payment))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/{payment_id}/cancel", post(cancel_payment))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub registration_id: Option<String>,
    pub student_id: Option<String>,
    pub order_name: Option<String>,
    pub amount: Option<i64>,
}

/// Parameters the browser hands to the provider's checkout SDK.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutParams {
    pub store_id: String,
    pub channel_key: String,
    pub payment_id: String,
    pub order_name: String,
    pub amount: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn merchant_payment_id() -> String {
    format!("pay-{}", new_id().replace('-', ""))
}

async fn prepare_payment(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<PrepareRequest>,
) -> Result<(StatusCode, ApiResponse<CheckoutParams>), AppError> {
    let order_name = validation::required(payload.order_name.as_deref(), "주문명", MAX_SHORT_TEXT)?;
    let amount = match payload.amount {
        Some(amount) if amount > 0 => amount,
        _ => return Err(AppError::InvalidInput("결제 금액을 확인해주세요.".to_string())),
    };
    let registration_id = validation::optional(payload.registration_id.as_deref(), "수강 신청", MAX_SHORT_TEXT)?;
    let student_id = validation::optional(payload.student_id.as_deref(), "학생", MAX_SHORT_TEXT)?;

    let payment_config = &app_state.config.payment;
    let (Some(store_id), Some(channel_key)) = (&payment_config.store_id, &payment_config.channel_key) else {
        return Err(AppError::InternalServerError(
            "payment store id or channel key is not configured".to_string(),
        ));
    };

    if let Some(registration_id) = &registration_id {
        registration_service::find_by_id(&app_state.db, registration_id)
            .await?
            .ok_or_else(|| not_found("수강 신청"))?;
    }

    let now = timestamp::now();
    let payment = Payment {
        id: new_id(),
        payment_id: merchant_payment_id(),
        registration_id,
        student_id,
        order_name,
        amount,
        status: PaymentStatus::Ready,
        method: None,
        provider_tx_id: None,
        fail_reason: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    payment_service::insert(&app_state.db, &payment).await?;
    info!(payment_id = %payment.payment_id, amount, "Payment prepared.");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(CheckoutParams {
            store_id: store_id.clone(),
            channel_key: channel_key.clone(),
            payment_id: payment.payment_id,
            order_name: payment.order_name,
            amount: payment.amount,
        }),
    ))
}

/// What confirm does before asking the provider.
#[derive(Debug, PartialEq, Eq)]
enum ConfirmStart {
    /// Settled by an earlier confirm; answer with the stored payment.
    AlreadyPaid,
    Verify,
}

fn confirm_start(status: PaymentStatus) -> Result<ConfirmStart, AppError> {
    match status {
        PaymentStatus::Paid => Ok(ConfirmStart::AlreadyPaid),
        PaymentStatus::Ready => Ok(ConfirmStart::Verify),
        PaymentStatus::Failed | PaymentStatus::Cancelled => Err(AppError::InvalidInput(format!(
            "처리할 수 없는 결제 상태입니다. ({status})"
        ))),
    }
}

/// The write confirm makes once the provider has answered. Every write moves
/// the payment out of `ready`.
#[derive(Debug, PartialEq)]
enum ConfirmStep {
    MarkPaid(Document),
    /// The linked registration is marked failed as well.
    MarkFailed { reason: String, set: Document },
    /// The customer has not finished paying. Nothing is written.
    Wait(String),
}

fn confirm_step(stored: &Payment, provider: &ProviderPayment, paid_at: &str) -> ConfirmStep {
    match payments::verify(stored, provider) {
        Verification::Paid => ConfirmStep::MarkPaid(doc! {
            "status": PaymentStatus::Paid.as_str(),
            "paidAt": paid_at,
            "method": provider.method.as_deref(),
            "providerTxId": provider.transaction_id.as_deref(),
        }),
        Verification::Pending(status) => ConfirmStep::Wait(status),
        Verification::Rejected(reason) => ConfirmStep::MarkFailed {
            set: doc! {
                "status": PaymentStatus::Failed.as_str(),
                "failReason": reason.as_str(),
            },
            reason,
        },
    }
}

async fn confirm_payment(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ConfirmRequest>,
) -> Result<ApiResponse<Payment>, AppError> {
    let payment_id = validation::required(payload.payment_id.as_deref(), "결제 번호", MAX_SHORT_TEXT)?;

    let stored = payment_service::find_by_payment_id(&app_state.db, &payment_id)
        .await?
        .ok_or_else(|| not_found("결제"))?;
    if confirm_start(stored.status)? == ConfirmStart::AlreadyPaid {
        return Ok(ApiResponse::ok_with_message(stored, "이미 결제가 완료되었습니다."));
    }

    let provider = app_state.payments.get_payment(&payment_id).await?;
    let paid_at = timestamp::format(&timestamp::now());
    match confirm_step(&stored, &provider, &paid_at) {
        ConfirmStep::MarkPaid(set) => {
            let updated =
                payment_service::transition(&app_state.db, &payment_id, PaymentStatus::Ready, set).await?;

            let payment = match updated {
                Some(payment) => payment,
                // A concurrent confirm won the race; report whatever it stored.
                None => payment_service::find_by_payment_id(&app_state.db, &payment_id)
                    .await?
                    .ok_or_else(|| not_found("결제"))?,
            };
            if payment.status != PaymentStatus::Paid {
                return Err(AppError::Conflict("결제 상태가 변경되었습니다.".to_string()));
            }

            if let Some(registration_id) = &payment.registration_id {
                registration_service::mark_paid(&app_state.db, registration_id).await?;
            }
            info!(payment_id = %payment_id, "Payment confirmed.");
            Ok(ApiResponse::ok_with_message(payment, "결제가 완료되었습니다."))
        }
        ConfirmStep::Wait(status) => Err(AppError::InvalidInput(format!(
            "결제가 아직 완료되지 않았습니다. (상태: {status})"
        ))),
        ConfirmStep::MarkFailed { reason, set } => {
            warn!(payment_id = %payment_id, reason = %reason, "Payment verification failed.");
            payment_service::transition(&app_state.db, &payment_id, PaymentStatus::Ready, set).await?;
            if let Some(registration_id) = &stored.registration_id {
                registration_service::set_payment_status(&app_state.db, registration_id, PaymentStatus::Failed)
                    .await?;
            }
            Err(AppError::InvalidInput(reason))
        }
    }
}

async fn list_payments(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PaymentQuery>,
) -> Result<ApiResponse<Paginated<Payment>>, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = payment_service::list(&app_state.db, query.status, page).await?;
    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

#[derive(Debug, PartialEq, Eq)]
enum CancelStep {
    /// Money moved: refund at the provider before recording the cancellation.
    Refund,
    /// Never paid; only our record changes.
    Void,
}

fn cancel_step(status: PaymentStatus) -> Result<CancelStep, AppError> {
    match status {
        PaymentStatus::Paid => Ok(CancelStep::Refund),
        PaymentStatus::Ready => Ok(CancelStep::Void),
        PaymentStatus::Failed | PaymentStatus::Cancelled => Err(AppError::Conflict(format!(
            "취소할 수 없는 결제 상태입니다. ({status})"
        ))),
    }
}

async fn cancel_payment(
    State(app_state): State<Arc<AppState>>,
    Path(payment_id): Path<String>,
    AppJson(payload): AppJson<CancelRequest>,
) -> Result<ApiResponse<Payment>, AppError> {
    let reason = validation::optional(payload.reason.as_deref(), "취소 사유", MAX_SHORT_TEXT * 2)?
        .unwrap_or_else(|| "관리자 취소".to_string());

    let stored = payment_service::find_by_payment_id(&app_state.db, &payment_id)
        .await?
        .ok_or_else(|| not_found("결제"))?;

    if cancel_step(stored.status)? == CancelStep::Refund {
        app_state.payments.cancel_payment(&payment_id, &reason).await?;
    }

    let payment = payment_service::transition(
        &app_state.db,
        &payment_id,
        stored.status,
        doc! {
            "status": PaymentStatus::Cancelled.as_str(),
            "failReason": reason.as_str(),
        },
    )
    .await?
    .ok_or_else(|| AppError::Conflict("결제 상태가 변경되었습니다.".to_string()))?;

    if let Some(registration_id) = &payment.registration_id {
        registration_service::set_payment_status(&app_state.db, registration_id, PaymentStatus::Cancelled)
            .await?;
    }
    info!(payment_id = %payment_id, "Payment cancelled.");
    Ok(ApiResponse::ok_with_message(payment, "결제가 취소되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(amount: i64) -> Payment {
        Payment {
            id: "p-1".to_string(),
            payment_id: "pay-1".to_string(),
            registration_id: Some("r-1".to_string()),
            student_id: None,
            order_name: "로봇 기초반 3월".to_string(),
            amount,
            status: PaymentStatus::Ready,
            method: None,
            provider_tx_id: None,
            fail_reason: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn provider(status: &str, amount: i64) -> ProviderPayment {
        ProviderPayment {
            status: status.to_string(),
            amount,
            method: Some("PaymentMethodCard".to_string()),
            transaction_id: Some("tx-9".to_string()),
        }
    }

    const PAID_AT: &str = "2026-03-02T09:00:00.000Z";

    #[test]
    fn test_confirm_start_by_stored_status() {
        assert_eq!(confirm_start(PaymentStatus::Paid).unwrap(), ConfirmStart::AlreadyPaid);
        assert_eq!(confirm_start(PaymentStatus::Ready).unwrap(), ConfirmStart::Verify);
        for status in [PaymentStatus::Failed, PaymentStatus::Cancelled] {
            let err = confirm_start(status).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_paid_provider_record_marks_paid() {
        let step = confirm_step(&stored(120_000), &provider("PAID", 120_000), PAID_AT);
        assert_eq!(
            step,
            ConfirmStep::MarkPaid(doc! {
                "status": "paid",
                "paidAt": PAID_AT,
                "method": "PaymentMethodCard",
                "providerTxId": "tx-9",
            })
        );
    }

    #[test]
    fn test_unfinished_provider_payment_writes_nothing() {
        let step = confirm_step(&stored(120_000), &provider("READY", 120_000), PAID_AT);
        assert_eq!(step, ConfirmStep::Wait("READY".to_string()));
    }

    #[test]
    fn test_amount_mismatch_marks_failed() {
        let ConfirmStep::MarkFailed { reason, set } =
            confirm_step(&stored(120_000), &provider("PAID", 1_000), PAID_AT)
        else {
            panic!("amount mismatch must fail the payment");
        };
        assert!(reason.contains("120000"));
        assert_eq!(set.get_str("status").unwrap(), "failed");
        assert_eq!(set.get_str("failReason").unwrap(), reason);
    }

    #[test]
    fn test_cancel_step_by_stored_status() {
        assert_eq!(cancel_step(PaymentStatus::Paid).unwrap(), CancelStep::Refund);
        assert_eq!(cancel_step(PaymentStatus::Ready).unwrap(), CancelStep::Void);
        for status in [PaymentStatus::Failed, PaymentStatus::Cancelled] {
            assert_eq!(cancel_step(status).unwrap_err().status(), StatusCode::CONFLICT);
        }
    }
}
