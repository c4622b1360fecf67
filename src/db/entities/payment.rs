use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Merchant-side order id handed to the payment provider. Unique.
    pub payment_id: String,
    pub registration_id: Option<String>,
    pub student_id: Option<String>,
    pub order_name: String,
    pub amount: i64,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub provider_tx_id: Option<String>,
    pub fail_reason: Option<String>,
    #[serde(with = "crate::db::timestamp::option", default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
