use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{PaymentError, PaymentGateway, ProviderPayment};
use crate::server::config::PaymentConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortOnePayment {
    status: String,
    transaction_id: Option<String>,
    amount: PortOneAmount,
    method: Option<PortOneMethod>,
}

#[derive(Deserialize)]
struct PortOneAmount {
    total: i64,
}

#[derive(Deserialize)]
struct PortOneMethod {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize, Default)]
struct PortOneErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Client for the PortOne V2 REST API.
pub struct PortOneClient {
    client: Client,
    api_url: String,
    api_secret: Option<String>,
}

impl PortOneClient {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.api_secret.as_deref().ok_or(PaymentError::NotConfigured)
    }

    async fn error_from(payment_id: &str, response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body: PortOneErrorBody = response.json().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND || body.kind.as_deref() == Some("PAYMENT_NOT_FOUND") {
            return PaymentError::NotFound(payment_id.to_string());
        }
        PaymentError::Api {
            status: status.as_u16(),
            message: body
                .message
                .or(body.kind)
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

#[async_trait]
impl PaymentGateway for PortOneClient {
    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        let response = self
            .client
            .get(format!("{}/payments/{}", self.api_url, payment_id))
            .header("Authorization", format!("PortOne {}", self.secret()?))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(payment_id, response).await);
        }

        let payment: PortOnePayment = response.json().await?;
        debug!(payment_id, status = %payment.status, "Fetched payment from provider.");
        Ok(ProviderPayment {
            status: payment.status,
            amount: payment.amount.total,
            method: payment.method.map(|m| m.kind),
            transaction_id: payment.transaction_id,
        })
    }

    async fn cancel_payment(&self, payment_id: &str, reason: &str) -> Result<(), PaymentError> {
        let response = self
            .client
            .post(format!("{}/payments/{}/cancel", self.api_url, payment_id))
            .header("Authorization", format!("PortOne {}", self.secret()?))
            .json(&json!({ "reason": reason }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(payment_id, response).await);
        }
        info!(payment_id, "Payment cancelled at provider.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_payload_parses() {
        let raw = r#"{
            "status": "PAID",
            "id": "order-1",
            "transactionId": "tx-77",
            "amount": { "total": 99000, "paid": 99000, "cancelled": 0 },
            "method": { "type": "PaymentMethodCard", "card": { "name": "국민" } },
            "orderName": "코딩 중급반"
        }"#;
        let payment: PortOnePayment = serde_json::from_str(raw).unwrap();
        assert_eq!(payment.status, "PAID");
        assert_eq!(payment.amount.total, 99000);
        assert_eq!(payment.transaction_id.as_deref(), Some("tx-77"));
        assert_eq!(payment.method.unwrap().kind, "PaymentMethodCard");
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_configured() {
        let client = PortOneClient::new(&PaymentConfig {
            api_url: "https://api.portone.io/".to_string(),
            api_secret: None,
            store_id: None,
            channel_key: None,
        });
        assert_eq!(client.api_url, "https://api.portone.io");
        assert!(matches!(
            client.get_payment("order-1").await,
            Err(PaymentError::NotConfigured)
        ));
    }
}
