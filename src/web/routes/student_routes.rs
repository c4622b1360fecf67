use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use mongodb::bson::{to_bson, Document};
use mongodb::Database;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{ensure_changes, ensure_deleted, not_found, set_optional_text, set_text};
use crate::db::{
    entities::student::{Attendance, AttendanceUpdate, EnrolledCourse, Student},
    new_id,
    services::{course_service, student_service},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    validation::{self, MAX_LONG_TEXT, MAX_SHORT_TEXT},
    AppState,
};

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/students/{id}/attendance", patch(update_attendance))
}

#[derive(Deserialize)]
pub struct StudentQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    pub name: Option<String>,
    pub birth_year: Option<i32>,
    pub school: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_user_id: Option<String>,
    /// Ids of the courses to enrol in; titles are copied from the courses.
    pub course_ids: Option<Vec<String>>,
    pub attendance: Option<AttendanceUpdate>,
    pub memo: Option<String>,
}

/// Resolves course ids into enrolments, rejecting unknown courses.
async fn resolve_enrolments(db: &Database, course_ids: &[String]) -> Result<Vec<EnrolledCourse>, AppError> {
    let mut courses = Vec::with_capacity(course_ids.len());
    for course_id in course_ids {
        if courses.iter().any(|c: &EnrolledCourse| &c.course_id == course_id) {
            continue;
        }
        let course = course_service::find_by_id(db, course_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("강좌를 찾을 수 없습니다: {course_id}")))?;
        courses.push(EnrolledCourse {
            course_id: course.id,
            title: course.title,
        });
    }
    Ok(courses)
}

fn check_birth_year(year: i32) -> Result<i32, AppError> {
    if !(1990..=2100).contains(&year) {
        return Err(AppError::InvalidInput("출생 연도를 확인해주세요.".to_string()));
    }
    Ok(year)
}

pub(crate) fn require_attendance_change(update: &AttendanceUpdate) -> Result<(), AppError> {
    if update.is_empty() {
        return Err(AppError::InvalidInput("변경할 출석 정보가 없습니다.".to_string()));
    }
    Ok(())
}

async fn list_students(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<StudentQuery>,
) -> Result<ApiResponse<Vec<Student>>, AppError> {
    let search = validation::optional(query.search.as_deref(), "검색어", MAX_SHORT_TEXT)?;
    let students = student_service::list(&app_state.db, search.as_deref()).await?;
    Ok(ApiResponse::ok(students))
}

async fn get_student(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Student>, AppError> {
    let student = student_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("학생"))?;
    Ok(ApiResponse::ok(student))
}

async fn create_student(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<StudentRequest>,
) -> Result<(StatusCode, ApiResponse<Student>), AppError> {
    let name = validation::required(payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?;
    let parent_name = validation::required(payload.parent_name.as_deref(), "보호자 이름", MAX_SHORT_TEXT)?;
    let parent_phone = validation::required_phone(payload.parent_phone.as_deref(), "보호자 연락처")?;
    let school = validation::optional(payload.school.as_deref(), "학교", MAX_SHORT_TEXT)?;
    let parent_user_id = validation::optional(payload.parent_user_id.as_deref(), "보호자 계정", MAX_SHORT_TEXT)?;
    let memo = validation::optional(payload.memo.as_deref(), "메모", MAX_LONG_TEXT)?;
    let birth_year = payload.birth_year.map(check_birth_year).transpose()?;

    let courses = resolve_enrolments(&app_state.db, &payload.course_ids.unwrap_or_default()).await?;
    let mut attendance = Attendance::default();
    if let Some(update) = payload.attendance {
        attendance.apply(update)?;
    }

    let now = timestamp::now();
    let student = Student {
        id: new_id(),
        name,
        birth_year,
        school,
        parent_name,
        parent_phone,
        parent_user_id,
        courses,
        attendance,
        memo,
        created_at: now,
        updated_at: now,
    };
    student_service::insert(&app_state.db, &student).await?;
    info!(student_id = %student.id, "Student created.");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(student, "학생이 등록되었습니다."),
    ))
}

async fn update_student(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<StudentRequest>,
) -> Result<ApiResponse<Student>, AppError> {
    if payload.attendance.is_some() {
        return Err(AppError::InvalidInput(
            "출석 정보는 출석 전용 경로로 수정해주세요.".to_string(),
        ));
    }
    let mut set = Document::new();
    set_text(&mut set, "name", payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?;
    set_text(&mut set, "parentName", payload.parent_name.as_deref(), "보호자 이름", MAX_SHORT_TEXT)?;
    if payload.parent_phone.is_some() {
        let phone = validation::required_phone(payload.parent_phone.as_deref(), "보호자 연락처")?;
        set.insert("parentPhone", phone);
    }
    set_optional_text(&mut set, "school", payload.school.as_deref(), "학교", MAX_SHORT_TEXT)?;
    set_optional_text(&mut set, "parentUserId", payload.parent_user_id.as_deref(), "보호자 계정", MAX_SHORT_TEXT)?;
    set_optional_text(&mut set, "memo", payload.memo.as_deref(), "메모", MAX_LONG_TEXT)?;
    if let Some(year) = payload.birth_year {
        set.insert("birthYear", check_birth_year(year)?);
    }
    if let Some(course_ids) = &payload.course_ids {
        let courses = resolve_enrolments(&app_state.db, course_ids).await?;
        set.insert("courses", to_bson(&courses)?);
    }
    ensure_changes(&set)?;

    let student = student_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("학생"))?;
    Ok(ApiResponse::ok_with_message(student, "학생 정보가 수정되었습니다."))
}

async fn update_attendance(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(change): AppJson<AttendanceUpdate>,
) -> Result<ApiResponse<Student>, AppError> {
    require_attendance_change(&change)?;
    let student = student_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("학생"))?;
    let student = student_service::update_attendance(&app_state.db, student, change).await?;
    Ok(ApiResponse::ok(student))
}

async fn delete_student(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_deleted(student_service::delete(&app_state.db, &id).await?, "학생")?;
    Ok(ApiResponse::message("학생이 삭제되었습니다."))
}
