use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Extension, Router,
};
use std::sync::Arc;
use tracing::warn;

use super::{not_found, student_routes::require_attendance_change};
use crate::db::{
    entities::{
        online_course::OnlineCourse,
        student::{AttendanceUpdate, Student},
    },
    services::{course_service, student_service},
};
use crate::web::{
    error::AppError, extract::AppJson, models::AuthenticatedUser, response::ApiResponse, AppState,
};

pub fn create_teacher_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(my_courses))
        .route("/students", get(my_students))
        .route("/students/{id}/attendance", patch(update_attendance))
}

async fn course_ids_of(app_state: &AppState, teacher_id: &str) -> Result<Vec<String>, AppError> {
    let courses = course_service::list_by_teacher(&app_state.db, teacher_id).await?;
    Ok(courses.into_iter().map(|course| course.id).collect())
}

async fn my_courses(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<OnlineCourse>>, AppError> {
    let courses = course_service::list_by_teacher(&app_state.db, &current_user.id).await?;
    Ok(ApiResponse::ok(courses))
}

async fn my_students(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<Student>>, AppError> {
    let course_ids = course_ids_of(&app_state, &current_user.id).await?;
    let students = student_service::list_by_course_ids(&app_state.db, &course_ids).await?;
    Ok(ApiResponse::ok(students))
}

async fn update_attendance(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(change): AppJson<AttendanceUpdate>,
) -> Result<ApiResponse<Student>, AppError> {
    require_attendance_change(&change)?;
    let student = student_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("학생"))?;

    let course_ids = course_ids_of(&app_state, &current_user.id).await?;
    if !student.is_enrolled_in_any(&course_ids) {
        warn!(teacher_id = %current_user.id, student_id = %id, "Attendance edit outside own courses.");
        return Err(AppError::Forbidden(
            "담당 강좌의 학생만 수정할 수 있습니다.".to_string(),
        ));
    }

    let student = student_service::update_attendance(&app_state.db, student, change).await?;
    Ok(ApiResponse::ok(student))
}
