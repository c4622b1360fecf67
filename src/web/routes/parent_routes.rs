use axum::{extract::State, routing::get, Extension, Router};
use std::sync::Arc;

use crate::db::{
    entities::{payment::Payment, student::Student, user::User},
    services::{payment_service, registration_service, student_service, user_service},
};
use crate::web::{error::AppError, models::AuthenticatedUser, response::ApiResponse, AppState};

pub fn create_parent_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/students", get(my_children))
        .route("/payments", get(my_payments))
}

/// The parent account, read fresh so an unlink takes effect before the token expires.
async fn current_parent(app_state: &AppState, user: &AuthenticatedUser) -> Result<User, AppError> {
    user_service::find_by_id(&app_state.db, &user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("계정을 찾을 수 없습니다.".to_string()))
}

async fn my_children(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<Student>>, AppError> {
    let parent = current_parent(&app_state, &current_user).await?;
    let students = student_service::list_by_ids(&app_state.db, &parent.student_ids).await?;
    Ok(ApiResponse::ok(students))
}

async fn my_payments(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<Payment>>, AppError> {
    let parent = current_parent(&app_state, &current_user).await?;
    // Registrations carry no student link; they are matched on the parent's phone.
    let registration_ids = match &parent.phone {
        Some(phone) => registration_service::ids_by_parent_phone(&app_state.db, phone).await?,
        None => Vec::new(),
    };
    let payments =
        payment_service::list_for_parent(&app_state.db, &parent.student_ids, &registration_ids).await?;
    Ok(ApiResponse::ok(payments))
}
