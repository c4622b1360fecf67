use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection, PageRequest};
use crate::db::{self, entities::news::News, enums::NewsCategory, timestamp};

fn news(db: &Database) -> mongodb::Collection<News> {
    collection(db, db::NEWS)
}

fn filter(published_only: bool, category: Option<NewsCategory>) -> Document {
    let mut filter = Document::new();
    if published_only {
        filter.insert("isPublished", true);
    }
    if let Some(category) = category {
        filter.insert("category", category.as_str());
    }
    filter
}

pub async fn list(
    db: &Database,
    published_only: bool,
    category: Option<NewsCategory>,
    page: PageRequest,
) -> mongodb::error::Result<(Vec<News>, u64)> {
    let filter = filter(published_only, category);
    let total = news(db).count_documents(filter.clone()).await?;
    let cursor = news(db)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .await?;
    Ok((collect_all(cursor).await?, total))
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<News>> {
    news(db).find_one(doc! { "_id": id }).await
}

/// Returns the published article with its view counter already incremented.
pub async fn view_published(db: &Database, id: &str) -> mongodb::error::Result<Option<News>> {
    news(db)
        .find_one_and_update(
            doc! { "_id": id, "isPublished": true },
            doc! { "$inc": { "views": 1 } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn insert(db: &Database, article: &News) -> mongodb::error::Result<()> {
    news(db).insert_one(article).await?;
    Ok(())
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<News>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    news(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = news(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
