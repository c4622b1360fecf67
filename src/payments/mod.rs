use async_trait::async_trait;
use thiserror::Error;

use crate::db::entities::payment::Payment;
use crate::web::error::AppError;

pub mod portone;

/// Provider-side view of a payment, reduced to what confirmation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayment {
    /// Provider status string, e.g. `PAID`, `READY`, `FAILED`, `CANCELLED`.
    pub status: String,
    pub amount: i64,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment provider is not configured")]
    NotConfigured,
    #[error("Payment not found at provider: {0}")]
    NotFound(String),
    #[error("Provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => {
                AppError::InternalServerError("payment provider is not configured".to_string())
            }
            PaymentError::NotFound(_) => {
                AppError::InvalidInput("결제 내역을 찾을 수 없습니다.".to_string())
            }
            PaymentError::Api { .. } | PaymentError::Network(_) => {
                tracing::warn!(error = %err, "Payment provider call failed.");
                AppError::UpstreamError("결제사 응답을 확인할 수 없습니다. 잠시 후 다시 시도해주세요.".to_string())
            }
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError>;
    async fn cancel_payment(&self, payment_id: &str, reason: &str) -> Result<(), PaymentError>;
}

/// Outcome of comparing the provider's record with ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Paid,
    /// The customer has not finished paying; nothing to record yet.
    Pending(String),
    Rejected(String),
}

pub const PROVIDER_PAID: &str = "PAID";

pub fn verify(stored: &Payment, provider: &ProviderPayment) -> Verification {
    match provider.status.as_str() {
        PROVIDER_PAID if provider.amount == stored.amount => Verification::Paid,
        PROVIDER_PAID => Verification::Rejected(format!(
            "결제 금액이 일치하지 않습니다. (예상 {}원, 실제 {}원)",
            stored.amount, provider.amount
        )),
        "READY" | "PENDING" | "VIRTUAL_ACCOUNT_ISSUED" => {
            Verification::Pending(provider.status.clone())
        }
        other => Verification::Rejected(format!("결제가 완료되지 않았습니다. (상태: {other})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::PaymentStatus;
    use chrono::Utc;

    fn stored(amount: i64) -> Payment {
        Payment {
            id: "p-1".to_string(),
            payment_id: "order-1".to_string(),
            registration_id: None,
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
            transaction_id: Some("tx-1".to_string()),
        }
    }

    #[test]
    fn test_matching_paid_payment_verifies() {
        assert_eq!(verify(&stored(120_000), &provider("PAID", 120_000)), Verification::Paid);
    }

    #[test]
    fn test_amount_mismatch_is_rejected() {
        let outcome = verify(&stored(120_000), &provider("PAID", 1_000));
        assert!(matches!(outcome, Verification::Rejected(reason) if reason.contains("120000")));
    }

    #[test]
    fn test_unfinished_and_failed_payments() {
        assert_eq!(
            verify(&stored(5_000), &provider("READY", 5_000)),
            Verification::Pending("READY".to_string())
        );
        assert!(matches!(
            verify(&stored(5_000), &provider("FAILED", 5_000)),
            Verification::Rejected(_)
        ));
    }
}
