use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRule {
    #[serde(default)]
    pub show_once_per_day: bool,
    /// Page paths the popup appears on; empty means every page.
    #[serde(default)]
    pub pages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    #[serde(with = "crate::db::timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub priority: i32,
    #[serde(default)]
    pub display_rule: DisplayRule,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Popup {
    pub fn shows_on(&self, page: &str) -> bool {
        self.display_rule.pages.is_empty() || self.display_rule.pages.iter().any(|p| p == page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn popup(is_active: bool, pages: Vec<&str>) -> Popup {
        let now = Utc::now();
        Popup {
            id: "p".to_string(),
            title: "여름방학 특강".to_string(),
            content: None,
            image_url: None,
            link_url: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active,
            priority: 0,
            display_rule: DisplayRule {
                show_once_per_day: true,
                pages: pages.into_iter().map(str::to_string).collect(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_page_rule() {
        assert!(popup(true, vec![]).shows_on("/programs"));
        let scoped = popup(true, vec!["/", "/programs"]);
        assert!(scoped.shows_on("/programs"));
        assert!(!scoped.shows_on("/news"));
    }
}
