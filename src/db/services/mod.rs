use futures::TryStreamExt;
use mongodb::{Collection, Cursor};
use serde::de::DeserializeOwned;

pub mod collected_news_service;
pub mod consultation_service;
pub mod conversion_service;
pub mod course_service;
pub mod faq_service;
pub mod news_service;
pub mod newsletter_service;
pub mod payment_service;
pub mod popup_service;
pub mod registration_service;
pub mod student_service;
pub mod user_service;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// 1-based page number and page size, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

pub(crate) async fn collect_all<T>(cursor: Cursor<T>) -> mongodb::error::Result<Vec<T>>
where
    T: DeserializeOwned + Send + Sync + Unpin,
{
    cursor.try_collect().await
}

pub(crate) fn collection<T: Send + Sync>(db: &mongodb::Database, name: &str) -> Collection<T> {
    db.collection::<T>(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 20 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, 100);
        assert_eq!(PageRequest::new(Some(3), Some(10)).skip(), 20);
    }
}
