use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection};
use crate::db::{self, entities::user::User, enums::Role, timestamp};

fn users(db: &Database) -> mongodb::Collection<User> {
    collection(db, db::USERS)
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<User>> {
    users(db).find_one(doc! { "_id": id }).await
}

pub async fn find_by_username(db: &Database, username: &str) -> mongodb::error::Result<Option<User>> {
    users(db).find_one(doc! { "username": username }).await
}

/// Parents sign in with the phone number the academy has on file.
pub async fn find_parent_by_phone(db: &Database, phone: &str) -> mongodb::error::Result<Option<User>> {
    users(db)
        .find_one(doc! { "phone": phone, "role": Role::Parent.as_str() })
        .await
}

pub async fn list(db: &Database, role: Option<Role>) -> mongodb::error::Result<Vec<User>> {
    let filter = match role {
        Some(role) => doc! { "role": role.as_str() },
        None => doc! {},
    };
    let cursor = users(db).find(filter).sort(doc! { "createdAt": -1 }).await?;
    collect_all(cursor).await
}

pub async fn insert(db: &Database, user: &User) -> mongodb::error::Result<()> {
    users(db).insert_one(user).await?;
    Ok(())
}

/// Applies a `$set` patch and returns the updated user.
pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<User>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    users(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = users(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
