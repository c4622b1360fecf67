use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub order: i32,
    pub is_published: bool,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
