use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection};
use crate::db::{self, entities::faq::Faq, timestamp};

fn faqs(db: &Database) -> mongodb::Collection<Faq> {
    collection(db, db::FAQS)
}

pub async fn list(db: &Database, published_only: bool, category: Option<&str>) -> mongodb::error::Result<Vec<Faq>> {
    let mut filter = Document::new();
    if published_only {
        filter.insert("isPublished", true);
    }
    if let Some(category) = category {
        filter.insert("category", category);
    }
    let cursor = faqs(db)
        .find(filter)
        .sort(doc! { "order": 1, "createdAt": 1 })
        .await?;
    collect_all(cursor).await
}

pub async fn insert(db: &Database, faq: &Faq) -> mongodb::error::Result<()> {
    faqs(db).insert_one(faq).await?;
    Ok(())
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<Faq>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    faqs(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = faqs(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
