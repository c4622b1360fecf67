use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::{PaymentStatus, RegistrationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: String,
    pub program_id: String,
    pub program_name: String,
    pub student_name: String,
    pub student_age: Option<u32>,
    pub parent_name: String,
    pub parent_phone: String,
    pub email: Option<String>,
    pub message: Option<String>,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub admin_memo: Option<String>,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
