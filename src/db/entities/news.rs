use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::NewsCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: NewsCategory,
    pub author_id: String,
    pub author_name: String,
    pub thumbnail: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub views: i64,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
