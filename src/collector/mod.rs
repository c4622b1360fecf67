use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod collection_service;
pub mod naver;
pub mod processing;

/// An article as returned by a source, before cleaning and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("News API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, keyword: &str) -> Result<Vec<RawArticle>, CollectorError>;
}
