use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Router,
};
use mongodb::bson::{Bson, Document};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{ensure_changes, ensure_deleted, not_found, set_text};
use crate::db::{
    entities::user::{User, UserResponse},
    enums::Role,
    new_id,
    services::{course_service, user_service},
    timestamp,
};
use crate::services::auth_service;
use crate::web::{
    error::AppError,
    extract::AppJson,
    models::AuthenticatedUser,
    response::ApiResponse,
    validation::{self, MAX_SHORT_TEXT},
    AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub student_ids: Option<Vec<String>>,
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "비밀번호는 {MIN_PASSWORD_LEN}자 이상이어야 합니다."
        )));
    }
    Ok(())
}

fn clean_student_ids(ids: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = ids
        .iter()
        .map(|id| validation::sanitize(id))
        .filter(|id| !id.is_empty())
        .collect();
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

fn optional_phone(value: Option<&str>) -> Result<Option<String>, AppError> {
    match validation::optional(value, "연락처", MAX_SHORT_TEXT)? {
        Some(raw) => Ok(Some(validation::required_phone(Some(&raw), "연락처")?)),
        None => Ok(None),
    }
}

/// Builds a new account from an admin request, hashing the password.
pub fn build_user(payload: UserRequest) -> Result<User, AppError> {
    let username = validation::required(payload.username.as_deref(), "아이디", MAX_SHORT_TEXT)?;
    let password = payload
        .password
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("비밀번호를 입력해주세요.".to_string()))?;
    check_password(password)?;
    let role = payload
        .role
        .ok_or_else(|| AppError::InvalidInput("권한을 선택해주세요.".to_string()))?;
    let name = validation::required(payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?;
    let email = validation::optional_email(payload.email.as_deref())?;
    let phone = optional_phone(payload.phone.as_deref())?;
    if role == Role::Parent && phone.is_none() {
        return Err(AppError::InvalidInput(
            "학부모 계정은 연락처가 필요합니다.".to_string(),
        ));
    }
    let student_ids = match role {
        Role::Parent => clean_student_ids(payload.student_ids.unwrap_or_default()),
        _ => Vec::new(),
    };

    let now = timestamp::now();
    Ok(User {
        id: new_id(),
        username,
        password_hash: auth_service::hash_password(password)?,
        role,
        name,
        email,
        phone,
        student_ids,
        created_at: now,
        updated_at: now,
    })
}

async fn list_users(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<ApiResponse<Vec<UserResponse>>, AppError> {
    let users = user_service::list(&app_state.db, query.role).await?;
    Ok(ApiResponse::ok(users.into_iter().map(UserResponse::from).collect()))
}

async fn get_user(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = user_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("사용자"))?;
    Ok(ApiResponse::ok(user.into()))
}

async fn create_user(
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<UserRequest>,
) -> Result<(StatusCode, ApiResponse<UserResponse>), AppError> {
    let user = build_user(payload)?;
    if user_service::find_by_username(&app_state.db, &user.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("이미 사용 중인 아이디입니다.".to_string()));
    }
    user_service::insert(&app_state.db, &user).await?;
    info!(user_id = %user.id, role = %user.role, "User created.");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(user.into(), "사용자가 등록되었습니다."),
    ))
}

async fn update_user(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UserRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let existing = user_service::find_by_id(&app_state.db, &id)
        .await?
        .ok_or_else(|| not_found("사용자"))?;

    let mut set = Document::new();
    set_text(&mut set, "username", payload.username.as_deref(), "아이디", MAX_SHORT_TEXT)?;
    set_text(&mut set, "name", payload.name.as_deref(), "이름", MAX_SHORT_TEXT)?;
    if payload.email.is_some() {
        let email = validation::optional_email(payload.email.as_deref())?;
        set.insert("email", email.map_or(Bson::Null, Bson::String));
    }
    if payload.phone.is_some() {
        let phone = optional_phone(payload.phone.as_deref())?;
        set.insert("phone", phone.map_or(Bson::Null, Bson::String));
    }
    if let Some(password) = payload.password.as_deref() {
        check_password(password)?;
        set.insert("passwordHash", auth_service::hash_password(password)?);
    }
    if let Some(role) = payload.role {
        set.insert("role", role.as_str());
    }
    let role = payload.role.unwrap_or(existing.role);
    if let Some(ids) = payload.student_ids {
        if role != Role::Parent {
            return Err(AppError::InvalidInput(
                "학생 연결은 학부모 계정만 가능합니다.".to_string(),
            ));
        }
        set.insert("studentIds", clean_student_ids(ids));
    }
    ensure_changes(&set)?;

    if let Ok(username) = set.get_str("username") {
        if username != existing.username
            && user_service::find_by_username(&app_state.db, username)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict("이미 사용 중인 아이디입니다.".to_string()));
        }
    }

    let user = user_service::update(&app_state.db, &id, set)
        .await?
        .ok_or_else(|| not_found("사용자"))?;

    if user.name != existing.name && matches!(user.role, Role::Teacher | Role::Admin) {
        let renamed = course_service::rename_teacher(&app_state.db, &user.id, &user.name).await?;
        info!(user_id = %user.id, courses = renamed, "Teacher name propagated to courses.");
    }
    Ok(ApiResponse::ok_with_message(user.into(), "사용자 정보가 수정되었습니다."))
}

async fn delete_user(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    if current_user.id == id {
        return Err(AppError::InvalidInput(
            "현재 로그인한 계정은 삭제할 수 없습니다.".to_string(),
        ));
    }
    ensure_deleted(user_service::delete(&app_state.db, &id).await?, "사용자")?;
    info!(user_id = %id, "User deleted.");
    Ok(ApiResponse::message("사용자가 삭제되었습니다."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Role) -> UserRequest {
        UserRequest {
            username: Some("parent01".to_string()),
            password: Some("robotics123".to_string()),
            role: Some(role),
            name: Some("박서연".to_string()),
            email: None,
            phone: Some("010-2222-3333".to_string()),
            student_ids: Some(vec![" s2 ".to_string(), "s1".to_string(), "s2".to_string(), "".to_string()]),
        }
    }

    #[test]
    fn test_parent_account_keeps_linked_students() {
        let user = build_user(request(Role::Parent)).unwrap();
        assert_eq!(user.student_ids, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(user.phone.as_deref(), Some("010-2222-3333"));
        assert!(auth_service::verify_password("robotics123", &user.password_hash).unwrap());
    }

    #[test]
    fn test_staff_account_drops_student_links() {
        let user = build_user(request(Role::Teacher)).unwrap();
        assert!(user.student_ids.is_empty());
    }

    #[test]
    fn test_rejects_short_password_and_parent_without_phone() {
        let mut payload = request(Role::Teacher);
        payload.password = Some("short".to_string());
        assert!(matches!(build_user(payload), Err(AppError::InvalidInput(_))));

        let mut payload = request(Role::Parent);
        payload.phone = None;
        assert!(matches!(build_user(payload), Err(AppError::InvalidInput(_))));
    }
}
