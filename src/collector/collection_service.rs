use chrono::{DateTime, Utc};
use mongodb::Database;
use tracing::{info, warn};

use super::{processing, NewsSource, RawArticle};
use crate::db::{
    entities::collected_news::{CollectedNewsArticle, NewsCollectionLog},
    new_id,
    services::collected_news_service,
    timestamp,
};
use crate::web::error::AppError;

/// Cleaned, scored and de-duplicated articles from one pass over all keywords.
#[derive(Debug, Default)]
pub struct CollectedBatch {
    pub articles: Vec<CollectedNewsArticle>,
    pub total_fetched: u32,
    pub duplicates: u32,
    pub errors: Vec<String>,
}

pub fn build_article(
    raw: RawArticle,
    keyword: &str,
    source: Option<String>,
    collected_at: DateTime<Utc>,
) -> CollectedNewsArticle {
    let title = processing::strip_html(&raw.title);
    let description = processing::strip_html(&raw.description);
    let url = raw.url.trim().to_string();
    CollectedNewsArticle {
        id: new_id(),
        relevance_score: processing::relevance_score(keyword, &title, &description),
        source: source.unwrap_or_else(|| processing::source_from_url(&url)),
        title,
        description,
        url,
        keyword: keyword.to_string(),
        published_at: raw.published_at,
        collected_at,
    }
}

/// Queries every keyword. A failing keyword is recorded and skipped.
pub async fn collect_batch(source: &dyn NewsSource, keywords: &[String]) -> CollectedBatch {
    let now = timestamp::now();
    let mut batch = CollectedBatch::default();
    let mut articles = Vec::new();

    for keyword in keywords {
        match source.search(keyword).await {
            Ok(found) => {
                batch.total_fetched += found.len() as u32;
                articles.extend(
                    found
                        .into_iter()
                        .filter(|raw| !raw.url.trim().is_empty())
                        .map(|raw| build_article(raw, keyword, None, now)),
                );
            }
            Err(e) => {
                warn!(source = source.name(), keyword = %keyword, error = %e, "News search failed.");
                batch.errors.push(format!("{}: {}", keyword, e));
            }
        }
    }

    let (articles, duplicates) = processing::dedupe_by_url(articles, |a| a.url.as_str());
    batch.articles = articles;
    batch.duplicates = duplicates;
    batch
}

/// Runs one collection pass and persists both the new articles and the run log.
pub async fn run_collection(
    db: &Database,
    source: &dyn NewsSource,
    keywords: &[String],
) -> Result<NewsCollectionLog, AppError> {
    let started_at = timestamp::now();
    let batch = collect_batch(source, keywords).await;

    let mut log = NewsCollectionLog {
        id: new_id(),
        started_at,
        finished_at: started_at,
        total_fetched: batch.total_fetched,
        inserted: 0,
        duplicates: batch.duplicates,
        errors: batch.errors,
    };

    for article in &batch.articles {
        match collected_news_service::insert_if_new(db, article).await {
            Ok(true) => log.inserted += 1,
            Ok(false) => log.duplicates += 1,
            Err(e) => {
                warn!(url = %article.url, error = %e, "Failed to store collected article.");
                log.errors.push(format!("{}: {}", article.url, e));
            }
        }
    }

    log.finished_at = timestamp::now();
    collected_news_service::insert_log(db, &log).await?;
    info!(
        fetched = log.total_fetched,
        inserted = log.inserted,
        duplicates = log.duplicates,
        errors = log.errors.len(),
        "News collection finished."
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorError;
    use async_trait::async_trait;

    struct FixedSource;

    #[async_trait]
    impl NewsSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn search(&self, keyword: &str) -> Result<Vec<RawArticle>, CollectorError> {
            let article = |url: &str| RawArticle {
                title: format!("<b>{keyword}</b> 소식"),
                description: "현장 취재".to_string(),
                url: url.to_string(),
                published_at: None,
            };
            match keyword {
                "코딩교육" => Ok(vec![article("https://a.kr/1"), article("https://a.kr/2")]),
                "로봇교육" => Ok(vec![article("https://a.kr/2"), article(" ")]),
                _ => Err(CollectorError::Api {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_batch_survives_failing_keyword() {
        let keywords = vec![
            "코딩교육".to_string(),
            "broken".to_string(),
            "로봇교육".to_string(),
        ];
        let batch = collect_batch(&FixedSource, &keywords).await;

        assert_eq!(batch.total_fetched, 4);
        assert_eq!(batch.articles.len(), 2);
        assert_eq!(batch.duplicates, 1);
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.errors[0].starts_with("broken"));

        let first = &batch.articles[0];
        assert_eq!(first.title, "코딩교육 소식");
        assert_eq!(first.source, "a.kr");
        assert_eq!(first.relevance_score, 67);
    }

    #[test]
    fn test_build_article_keeps_explicit_source() {
        let raw = RawArticle {
            title: "AI &amp; 로봇".to_string(),
            description: String::new(),
            url: " https://edu.kr/x ".to_string(),
            published_at: None,
        };
        let article = build_article(raw, "로봇", Some("교육신문".to_string()), Utc::now());
        assert_eq!(article.title, "AI & 로봇");
        assert_eq!(article.url, "https://edu.kr/x");
        assert_eq!(article.source, "교육신문");
    }
}
