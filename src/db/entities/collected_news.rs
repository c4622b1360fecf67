use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedNewsArticle {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    /// Unique across the collection.
    pub url: String,
    pub source: String,
    pub keyword: String,
    #[serde(with = "crate::db::timestamp::option", default)]
    pub published_at: Option<DateTime<Utc>>,
    pub relevance_score: u32,
    #[serde(with = "crate::db::timestamp")]
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCollectionLog {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "crate::db::timestamp")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub finished_at: DateTime<Utc>,
    pub total_fetched: u32,
    pub inserted: u32,
    pub duplicates: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}
