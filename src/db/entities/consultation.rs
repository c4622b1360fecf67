use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::ConsultationStatus;

/// A consultation request captured from the public site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub child_age: Option<u32>,
    pub interest: String,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
    pub status: ConsultationStatus,
    pub admin_memo: Option<String>,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
