use mongodb::{
    bson::{doc, to_document},
    Database,
};

use super::{collect_all, collection, PageRequest};
use crate::db::{
    self,
    entities::collected_news::{CollectedNewsArticle, NewsCollectionLog},
};

fn articles(db: &Database) -> mongodb::Collection<CollectedNewsArticle> {
    collection(db, db::COLLECTED_NEWS)
}

fn logs(db: &Database) -> mongodb::Collection<NewsCollectionLog> {
    collection(db, db::NEWS_COLLECTION_LOGS)
}

/// Inserts the article unless one with the same URL already exists.
/// Returns `true` when a new document was created.
pub async fn insert_if_new(db: &Database, article: &CollectedNewsArticle) -> Result<bool, crate::web::error::AppError> {
    let mut fields = to_document(article)?;
    fields.remove("url");

    let result = articles(db)
        .update_one(
            doc! { "url": article.url.as_str() },
            doc! { "$setOnInsert": fields },
        )
        .upsert(true)
        .await;

    match result {
        Ok(outcome) => Ok(outcome.upserted_id.is_some()),
        // Two concurrent upserts on a fresh URL: the unique index rejects the loser.
        Err(e) if crate::web::error::is_duplicate_key(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub async fn list(
    db: &Database,
    keyword: Option<&str>,
    min_score: Option<u32>,
    page: PageRequest,
) -> mongodb::error::Result<(Vec<CollectedNewsArticle>, u64)> {
    let mut filter = doc! {};
    if let Some(keyword) = keyword {
        filter.insert("keyword", keyword);
    }
    if let Some(min_score) = min_score {
        filter.insert("relevanceScore", doc! { "$gte": min_score as i64 });
    }
    let total = articles(db).count_documents(filter.clone()).await?;
    let cursor = articles(db)
        .find(filter)
        .sort(doc! { "relevanceScore": -1, "collectedAt": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .await?;
    Ok((collect_all(cursor).await?, total))
}

pub async fn count_by_url(db: &Database, url: &str) -> mongodb::error::Result<u64> {
    articles(db).count_documents(doc! { "url": url }).await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = articles(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}

pub async fn insert_log(db: &Database, log: &NewsCollectionLog) -> mongodb::error::Result<()> {
    logs(db).insert_one(log).await?;
    Ok(())
}

pub async fn recent_logs(db: &Database, limit: i64) -> mongodb::error::Result<Vec<NewsCollectionLog>> {
    let cursor = logs(db)
        .find(doc! {})
        .sort(doc! { "startedAt": -1 })
        .limit(limit)
        .await?;
    collect_all(cursor).await
}
