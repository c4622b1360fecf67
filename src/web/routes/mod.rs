use mongodb::bson::{Bson, Document};

use crate::web::{error::AppError, validation};

pub mod auth_routes;
pub mod collected_news_routes;
pub mod consultation_routes;
pub mod conversion_routes;
pub mod course_routes;
pub mod cron_routes;
pub mod faq_routes;
pub mod news_routes;
pub mod newsletter_routes;
pub mod parent_routes;
pub mod payment_routes;
pub mod popup_routes;
pub mod registration_routes;
pub mod student_routes;
pub mod teacher_routes;
pub mod upload_routes;
pub mod user_routes;

/// Sets a required text field when the request carries it. Blank is rejected.
pub(crate) fn set_text(
    set: &mut Document,
    key: &str,
    value: Option<&str>,
    label: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if value.is_some() {
        set.insert(key, validation::required(value, label, max_len)?);
    }
    Ok(())
}

/// Sets a nullable text field when the request carries it. Blank clears it.
pub(crate) fn set_optional_text(
    set: &mut Document,
    key: &str,
    value: Option<&str>,
    label: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if value.is_some() {
        let cleaned = validation::optional(value, label, max_len)?;
        set.insert(key, cleaned.map_or(Bson::Null, Bson::String));
    }
    Ok(())
}

pub(crate) fn ensure_changes(set: &Document) -> Result<(), AppError> {
    if set.is_empty() {
        return Err(AppError::InvalidInput("변경할 항목이 없습니다.".to_string()));
    }
    Ok(())
}

pub(crate) fn not_found(label: &str) -> AppError {
    AppError::NotFound(format!("{label}을(를) 찾을 수 없습니다."))
}

pub(crate) fn ensure_deleted(deleted: u64, label: &str) -> Result<(), AppError> {
    if deleted == 0 {
        return Err(not_found(label));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_helpers() {
        let mut set = Document::new();
        set_text(&mut set, "title", None, "제목", 10).unwrap();
        assert!(set.is_empty());
        assert!(ensure_changes(&set).is_err());

        set_text(&mut set, "title", Some("  새 제목 "), "제목", 10).unwrap();
        set_optional_text(&mut set, "memo", Some("   "), "메모", 10).unwrap();
        assert_eq!(set.get_str("title").unwrap(), "새 제목");
        assert_eq!(set.get("memo"), Some(&Bson::Null));

        assert!(set_text(&mut set, "title", Some(" "), "제목", 10).is_err());
        assert!(ensure_deleted(0, "공지").is_err());
        assert!(ensure_deleted(1, "공지").is_ok());
    }
}
