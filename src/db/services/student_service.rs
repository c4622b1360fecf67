use mongodb::{
    bson::{doc, Document},
    Database,
};

use super::{collect_all, collection};
use crate::db::{
    self,
    entities::student::{AttendanceUpdate, Student},
    timestamp,
};

fn students(db: &Database) -> mongodb::Collection<Student> {
    collection(db, db::STUDENTS)
}

pub async fn find_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<Student>> {
    students(db).find_one(doc! { "_id": id }).await
}

pub async fn list(db: &Database, search: Option<&str>) -> mongodb::error::Result<Vec<Student>> {
    let filter = match search {
        Some(term) => doc! { "name": { "$regex": regex_escape(term), "$options": "i" } },
        None => doc! {},
    };
    let cursor = students(db).find(filter).sort(doc! { "name": 1 }).await?;
    collect_all(cursor).await
}

pub async fn list_by_ids(db: &Database, ids: &[String]) -> mongodb::error::Result<Vec<Student>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let cursor = students(db)
        .find(doc! { "_id": { "$in": ids } })
        .sort(doc! { "name": 1 })
        .await?;
    collect_all(cursor).await
}

pub async fn list_by_course_ids(db: &Database, course_ids: &[String]) -> mongodb::error::Result<Vec<Student>> {
    if course_ids.is_empty() {
        return Ok(Vec::new());
    }
    let cursor = students(db)
        .find(doc! { "courses.courseId": { "$in": course_ids } })
        .sort(doc! { "name": 1 })
        .await?;
    collect_all(cursor).await
}

pub async fn insert(db: &Database, student: &Student) -> mongodb::error::Result<()> {
    students(db).insert_one(student).await?;
    Ok(())
}

pub async fn update(db: &Database, id: &str, mut set: Document) -> mongodb::error::Result<Option<Student>> {
    set.insert("updatedAt", timestamp::format(&timestamp::now()));
    students(db)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await
}

/// Applies the edit and rewrites the whole attendance block, rate included.
pub async fn update_attendance(
    db: &Database,
    mut student: Student,
    change: AttendanceUpdate,
) -> Result<Student, crate::web::error::AppError> {
    student.attendance.apply(change)?;
    student.updated_at = timestamp::now();

    students(db)
        .update_one(
            doc! { "_id": student.id.as_str() },
            doc! { "$set": {
                "attendance": mongodb::bson::to_bson(&student.attendance)?,
                "updatedAt": timestamp::format(&student.updated_at),
            } },
        )
        .await?;
    Ok(student)
}

/// Keeps the denormalized course title on enrolments in step with the course.
pub async fn rename_enrolled_course(db: &Database, course_id: &str, title: &str) -> mongodb::error::Result<u64> {
    let result = students(db)
        .update_many(
            doc! { "courses.courseId": course_id },
            doc! { "$set": { "courses.$[c].title": title } },
        )
        .array_filters(vec![doc! { "c.courseId": course_id }])
        .await?;
    Ok(result.modified_count)
}

pub async fn delete(db: &Database, id: &str) -> mongodb::error::Result<u64> {
    let result = students(db).delete_one(doc! { "_id": id }).await?;
    Ok(result.deleted_count)
}

/// Escapes user input for use inside a `$regex` filter.
pub fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_escape() {
        assert_eq!(regex_escape("김.민*준"), "김\\.민\\*준");
        assert_eq!(regex_escape("plain"), "plain");
    }
}
