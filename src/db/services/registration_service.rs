use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection, PageRequest};
use crate::db::{
    self,
    entities::registration::Registration,
    enums::{PaymentStatus, RegistrationStatus},
    timestamp,
};

fn registrations(db: &Database) -> mongodb::Collection<Registration> {
    collection(db, db::REGISTRATIONS)
}

pub async fn insert(db: &Database, registration: &Registration) -> mongodb::error::Result<()> {
    registrations(db).insert_one(registration).await?;
    Ok(())
}

pub async fn list(
    db: &Database,
    status: Option<RegistrationStatus>,
    program_id: Option<&str>,
    page: PageRequest,
) -> mongodb::error::Result<(Vec<Registration>, u64)> {
    let mut filter = Document::new();
    if let Some(status) = status {
        filter.insert("status", status.as_str());
    }
    if let Some(program_id) = program_id {
        filter.insert("programId", program_id);
    }
    let total = registrations(db).count_documents(filter.clone()).await?;
    let cursor = registrations(db)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .await?;
    Ok((collect_all(cursor).await?, total))
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<Registration>> {
    registrations(db).find_one(doc! { "_id": id }).await
}

/// Ids of registrations filed under a parent's (normalized) phone number.
pub async fn ids_by_parent_phone(db: &Database, phone: &str) -> mongodb::error::Result<Vec<String>> {
    let ids = registrations(db)
        .distinct("_id", doc! { "parentPhone": phone })
        .await?;
    Ok(ids
        .into_iter()
        .filter_map(|id| id.as_str().map(str::to_string))
        .collect())
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<Registration>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    registrations(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

/// A paid registration is confirmed in the same write.
pub async fn mark_paid(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = registrations(db)
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "paymentStatus": PaymentStatus::Paid.as_str(),
                "status": RegistrationStatus::Confirmed.as_str(),
                "updatedAt": timestamp::format(&timestamp::now()),
            } },
        )
        .await?;
    Ok(result.modified_count)
}

pub async fn set_payment_status(db: &Database, id: &str, status: PaymentStatus) -> mongodb::error::Result<u64> {
    let result = registrations(db)
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "paymentStatus": status.as_str(),
                "updatedAt": timestamp::format(&timestamp::now()),
            } },
        )
        .await?;
    Ok(result.modified_count)
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = registrations(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
