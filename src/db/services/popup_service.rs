use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection};
use crate::db::{self, entities::popup::Popup, timestamp};

fn popups(db: &Database) -> mongodb::Collection<Popup> {
    collection(db, db::POPUPS)
}

pub async fn list_all(db: &Database) -> mongodb::error::Result<Vec<Popup>> {
    let cursor = popups(db)
        .find(doc! {})
        .sort(doc! { "priority": -1, "createdAt": -1 })
        .await?;
    collect_all(cursor).await
}

/// Active popups whose display window contains `now`, highest priority first.
pub async fn list_active(db: &Database) -> mongodb::error::Result<Vec<Popup>> {
    let now = timestamp::format(&timestamp::now());
    let cursor = popups(db)
        .find(doc! {
            "isActive": true,
            "startDate": { "$lte": now.as_str() },
            "endDate": { "$gte": now.as_str() },
        })
        .sort(doc! { "priority": -1, "createdAt": -1 })
        .await?;
    collect_all(cursor).await
}

pub async fn insert(db: &Database, popup: &Popup) -> mongodb::error::Result<()> {
    popups(db).insert_one(popup).await?;
    Ok(())
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<Popup>> {
    popups(db).find_one(doc! { "_id": id }).await
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<Popup>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    popups(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = popups(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
