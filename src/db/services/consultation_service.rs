use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection, PageRequest};
use crate::db::{self, entities::consultation::Consultation, enums::ConsultationStatus, timestamp};

fn consultations(db: &Database) -> mongodb::Collection<Consultation> {
    collection(db, db::CONSULTATIONS)
}

pub async fn insert(db: &Database, consultation: &Consultation) -> mongodb::error::Result<()> {
    consultations(db).insert_one(consultation).await?;
    Ok(())
}

pub async fn list(
    db: &Database,
    status: Option<ConsultationStatus>,
    page: PageRequest,
) -> mongodb::error::Result<(Vec<Consultation>, u64)> {
    let filter = match status {
        Some(status) => doc! { "status": status.as_str() },
        None => doc! {},
    };
    let total = consultations(db).count_documents(filter.clone()).await?;
    let cursor = consultations(db)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .await?;
    Ok((collect_all(cursor).await?, total))
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<Consultation>> {
    consultations(db).find_one(doc! { "_id": id }).await
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<Consultation>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    consultations(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = consultations(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
