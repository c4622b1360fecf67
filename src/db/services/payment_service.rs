use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection, PageRequest};
use crate::db::{self, entities::payment::Payment, enums::PaymentStatus, timestamp};

fn payments(db: &Database) -> mongodb::Collection<Payment> {
    collection(db, db::PAYMENTS)
}

pub async fn insert(db: &Database, payment: &Payment) -> mongodb::error::Result<()> {
    payments(db).insert_one(payment).await?;
    Ok(())
}

pub async fn find_by_payment_id(db: &Database, payment_id: &str) -> mongodb::error::Result<Option<Payment>> {
    payments(db).find_one(doc! { "paymentId": payment_id }).await
}

pub async fn list(
    db: &Database,
    status: Option<PaymentStatus>,
    page: PageRequest,
) -> mongodb::error::Result<(Vec<Payment>, u64)> {
    let filter = match status {
        Some(status) => doc! { "status": status.as_str() },
        None => doc! {},
    };
    let total = payments(db).count_documents(filter.clone()).await?;
    let cursor = payments(db)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .await?;
    Ok((collect_all(cursor).await?, total))
}

/// Matches payments made for any of the students or against any of the
/// registrations. `None` when there is nothing to match.
pub fn parent_filter(student_ids: &[String], registration_ids: &[String]) -> Option<Document> {
    let mut clauses = Vec::new();
    if !student_ids.is_empty() {
        clauses.push(doc! { "studentId": { "$in": student_ids } });
    }
    if !registration_ids.is_empty() {
        clauses.push(doc! { "registrationId": { "$in": registration_ids } });
    }
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(doc! { "$or": clauses }),
    }
}

pub async fn list_for_parent(
    db: &Database,
    student_ids: &[String],
    registration_ids: &[String],
) -> mongodb::error::Result<Vec<Payment>> {
    let Some(filter) = parent_filter(student_ids, registration_ids) else {
        return Ok(Vec::new());
    };
    let cursor = payments(db)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?;
    collect_all(cursor).await
}

/// Moves a payment out of `expected` into a new state. The status guard keeps a
/// concurrent confirm/cancel from overwriting a payment that already moved on.
pub async fn transition(
    db: &Database,
    payment_id: &str,
    expected: PaymentStatus,
    mut set: Document,
) -> mongodb::error::Result<Option<Payment>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    payments(db)
        .find_one_and_update(
            doc! { "paymentId": payment_id, "status": expected.as_str() },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}
