use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection};
use crate::db::{self, entities::online_course::OnlineCourse, enums::CourseStatus, timestamp};

fn courses(db: &Database) -> mongodb::Collection<OnlineCourse> {
    collection(db, db::ONLINE_COURSES)
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<OnlineCourse>> {
    courses(db).find_one(doc! { "_id": id }).await
}

pub async fn list(
    db: &Database,
    status: Option<CourseStatus>,
    category: Option<&str>,
) -> mongodb::error::Result<Vec<OnlineCourse>> {
    let mut filter = Document::new();
    if let Some(status) = status {
        filter.insert("status", status.as_str());
    }
    if let Some(category) = category {
        filter.insert("category", category);
    }
    let cursor = courses(db).find(filter).sort(doc! { "createdAt": -1 }).await?;
    collect_all(cursor).await
}

pub async fn list_by_teacher(db: &Database, teacher_id: &str) -> mongodb::error::Result<Vec<OnlineCourse>> {
    let cursor = courses(db)
        .find(doc! { "teacherId": teacher_id })
        .sort(doc! { "createdAt": -1 })
        .await?;
    collect_all(cursor).await
}

pub async fn insert(db: &Database, course: &OnlineCourse) -> mongodb::error::Result<()> {
    courses(db).insert_one(course).await?;
    Ok(())
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<OnlineCourse>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    courses(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

/// Rewrites the denormalized teacher name on every course the teacher owns.
pub async fn rename_teacher(db: &Database, teacher_id: &str, teacher_name: &str) -> mongodb::error::Result<u64> {
    let result = courses(db)
        .update_many(
            doc! { "teacherId": teacher_id },
            doc! { "$set": { "teacherName": teacher_name } },
        )
        .await?;
    Ok(result.modified_count)
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = courses(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}
