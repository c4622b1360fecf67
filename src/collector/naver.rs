use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{CollectorError, NewsSource, RawArticle};
use crate::server::config::NewsCollectorConfig;

const NAVER_NEWS_URL: &str = "https://openapi.naver.com/v1/search/news.json";
const RESULTS_PER_KEYWORD: u32 = 30;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    title: String,
    #[serde(default)]
    originallink: String,
    link: String,
    #[serde(default)]
    description: String,
    pub_date: Option<String>,
}

impl SearchItem {
    fn into_raw(self) -> RawArticle {
        // Prefer the publisher's own URL; `link` may point at the portal mirror.
        let url = if self.originallink.is_empty() {
            self.link
        } else {
            self.originallink
        };
        RawArticle {
            title: self.title,
            description: self.description,
            url,
            published_at: self.pub_date.as_deref().and_then(parse_pub_date),
        }
    }
}

/// Naver returns RFC 2822 dates, e.g. `Mon, 17 Mar 2025 10:00:00 +0900`.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct NaverNewsSource {
    client: Client,
    client_id: String,
    client_secret: String,
}

impl NaverNewsSource {
    /// `None` when the API credentials are not configured.
    pub fn from_config(config: &NewsCollectorConfig) -> Option<Self> {
        Some(Self {
            client: Client::new(),
            client_id: config.naver_client_id.clone()?,
            client_secret: config.naver_client_secret.clone()?,
        })
    }
}

#[async_trait]
impl NewsSource for NaverNewsSource {
    fn name(&self) -> &'static str {
        "naver"
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RawArticle>, CollectorError> {
        let display = RESULTS_PER_KEYWORD.to_string();
        let response = self
            .client
            .get(NAVER_NEWS_URL)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[("query", keyword), ("display", display.as_str()), ("sort", "date")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.items.into_iter().map(SearchItem::into_raw).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parses() {
        let raw = r#"{
            "lastBuildDate": "Mon, 17 Mar 2025 10:00:00 +0900",
            "total": 2,
            "items": [
                {
                    "title": "<b>코딩교육</b> 의무화",
                    "originallink": "https://www.edunews.kr/1",
                    "link": "https://n.news.naver.com/1",
                    "description": "초등 <b>코딩교육</b> 확대",
                    "pubDate": "Mon, 17 Mar 2025 10:00:00 +0900"
                },
                {
                    "title": "로봇 대회",
                    "originallink": "",
                    "link": "https://n.news.naver.com/2",
                    "description": "",
                    "pubDate": "not a date"
                }
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let articles: Vec<RawArticle> = parsed.items.into_iter().map(SearchItem::into_raw).collect();

        assert_eq!(articles[0].url, "https://www.edunews.kr/1");
        assert_eq!(
            articles[0].published_at.unwrap().to_rfc3339(),
            "2025-03-17T01:00:00+00:00"
        );
        assert_eq!(articles[1].url, "https://n.news.naver.com/2");
        assert!(articles[1].published_at.is_none());
    }

    #[test]
    fn test_requires_credentials() {
        let mut config = NewsCollectorConfig::default();
        assert!(NaverNewsSource::from_config(&config).is_none());
        config.naver_client_id = Some("id".to_string());
        config.naver_client_secret = Some("secret".to_string());
        assert!(NaverNewsSource::from_config(&config).is_some());
    }
}
