use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::NewsletterStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    #[serde(with = "crate::db::timestamp")]
    pub subscribed_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp::option", default)]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub status: NewsletterStatus,
    #[serde(with = "crate::db::timestamp::option", default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recipient_count: u32,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
