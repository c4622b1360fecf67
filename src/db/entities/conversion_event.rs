use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_type: String,
    pub session_id: String,
    pub page: Option<String>,
    pub source: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
}
