use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::CourseStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSchedule {
    #[serde(default)]
    pub days: Vec<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineCourse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub teacher_id: Option<String>,
    /// Denormalized from the teacher's user record; rewritten whenever `teacher_id` changes.
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub schedule: CourseSchedule,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    pub capacity: Option<u32>,
    pub price: i64,
    pub status: CourseStatus,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}
