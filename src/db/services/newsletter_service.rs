use mongodb::{bson::doc, Database};

use super::{collect_all, collection};
use crate::db::{
    self,
    entities::newsletter::{Newsletter, NewsletterSubscriber},
    enums::NewsletterStatus,
    timestamp,
};

fn subscribers(db: &Database) -> mongodb::Collection<NewsletterSubscriber> {
    collection(db, db::NEWSLETTER_SUBSCRIBERS)
}

fn newsletters(db: &Database) -> mongodb::Collection<Newsletter> {
    collection(db, db::NEWSLETTERS)
}

pub enum SubscribeOutcome {
    Created(NewsletterSubscriber),
    Reactivated(NewsletterSubscriber),
    AlreadyActive,
}

pub async fn subscribe(
    db: &Database,
    email: &str,
    name: Option<String>,
) -> mongodb::error::Result<SubscribeOutcome> {
    if let Some(existing) = subscribers(db).find_one(doc! { "email": email }).await? {
        if existing.is_active {
            return Ok(SubscribeOutcome::AlreadyActive);
        }
        let now = timestamp::now();
        let reactivated = subscribers(db)
            .find_one_and_update(
                doc! { "_id": existing.id.as_str() },
                doc! {
                    "$set": { "isActive": true, "subscribedAt": timestamp::format(&now), "name": name.as_deref() },
                    "$unset": { "unsubscribedAt": "" },
                },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?;
        return Ok(match reactivated {
            Some(subscriber) => SubscribeOutcome::Reactivated(subscriber),
            None => SubscribeOutcome::AlreadyActive,
        });
    }

    let subscriber = NewsletterSubscriber {
        id: db::new_id(),
        email: email.to_string(),
        name,
        is_active: true,
        subscribed_at: timestamp::now(),
        unsubscribed_at: None,
    };
    subscribers(db).insert_one(&subscriber).await?;
    Ok(SubscribeOutcome::Created(subscriber))
}

/// Returns whether an active subscription was switched off.
pub async fn unsubscribe(db: &Database, email: &str) -> mongodb::error::Result<bool> {
    let result = subscribers(db)
        .update_one(
            doc! { "email": email, "isActive": true },
            doc! { "$set": {
                "isActive": false,
                "unsubscribedAt": timestamp::format(&timestamp::now()),
            } },
        )
        .await?;
    Ok(result.modified_count > 0)
}

pub async fn list_subscribers(db: &Database, active_only: bool) -> mongodb::error::Result<Vec<NewsletterSubscriber>> {
    let filter = if active_only {
        doc! { "isActive": true }
    } else {
        doc! {}
    };
    let cursor = subscribers(db)
        .find(filter)
        .sort(doc! { "subscribedAt": -1 })
        .await?;
    collect_all(cursor).await
}

pub async fn list_newsletters(db: &Database) -> mongodb::error::Result<Vec<Newsletter>> {
    let cursor = newsletters(db).find(doc! {}).sort(doc! { "createdAt": -1 }).await?;
    collect_all(cursor).await
}

pub async fn find_newsletter(db: &Database, id: &str) -> mongodb::error::Result<Option<Newsletter>> {
    newsletters(db).find_one(doc! { "_id": id }).await
}

pub async fn insert_newsletter(db: &Database, newsletter: &Newsletter) -> mongodb::error::Result<()> {
    newsletters(db).insert_one(newsletter).await?;
    Ok(())
}

/// Claims a draft for dispatch. `None` when it is missing or no longer a draft,
/// so only one send can be in flight per newsletter.
pub async fn claim_draft(db: &Database, id: &str) -> mongodb::error::Result<Option<Newsletter>> {
    newsletters(db)
        .find_one_and_update(
            doc! { "_id": id, "status": NewsletterStatus::Draft.as_str() },
            doc! { "$set": {
                "status": NewsletterStatus::Sending.as_str(),
                "updatedAt": timestamp::format(&timestamp::now()),
            } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

/// Records a finished dispatch on a claimed newsletter.
pub async fn mark_sent(db: &Database, id: &str, recipient_count: u32) -> mongodb::error::Result<Option<Newsletter>> {
    let now = timestamp::format(&timestamp::now());
    newsletters(db)
        .find_one_and_update(
            doc! { "_id": id, "status": NewsletterStatus::Sending.as_str() },
            doc! { "$set": {
                "status": NewsletterStatus::Sent.as_str(),
                "sentAt": now.as_str(),
                "recipientCount": recipient_count as i64,
                "updatedAt": now.as_str(),
            } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

/// Hands a claimed newsletter back as a draft after a dispatch that reached nobody.
pub async fn release_claim(db: &Database, id: &str) -> mongodb::error::Result<()> {
    newsletters(db)
        .update_one(
            doc! { "_id": id, "status": NewsletterStatus::Sending.as_str() },
            doc! { "$set": {
                "status": NewsletterStatus::Draft.as_str(),
                "updatedAt": timestamp::format(&timestamp::now()),
            } },
        )
        .await?;
    Ok(())
}

pub async fn delete_newsletter(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = newsletters(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
