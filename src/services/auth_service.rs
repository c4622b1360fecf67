use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::{entities::user::User, enums::Role, services::user_service};
use crate::web::error::AppError;

pub const STAFF_TOKEN_HOURS: i64 = 24;
pub const PARENT_TOKEN_DAYS: i64 = 30;

/// JWT claims carried by the `auth-token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub ttl: Duration,
}

pub fn token_ttl(role: Role) -> Duration {
    match role {
        Role::Parent => Duration::days(PARENT_TOKEN_DAYS),
        _ => Duration::hours(STAFF_TOKEN_HOURS),
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(format!("비밀번호 해시 실패: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::InternalServerError(format!("비밀번호 검증 중 오류: {e}")))
}

pub fn claims_for(user: &User, issued_at: DateTime<Utc>) -> Claims {
    Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role,
        name: user.name.clone(),
        iat: issued_at.timestamp(),
        exp: (issued_at + token_ttl(user.role)).timestamp(),
    }
}

pub fn encode_claims(claims: &Claims, jwt_secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::TokenCreationError(format!("토큰 생성 실패: {e}")))
}

pub fn issue_token(user: &User, jwt_secret: &str) -> Result<IssuedToken, AppError> {
    let claims = claims_for(user, Utc::now());
    Ok(IssuedToken {
        token: encode_claims(&claims, jwt_secret)?,
        ttl: token_ttl(user.role),
    })
}

/// Returns the claims of a valid, unexpired token and `None` otherwise.
pub fn verify_token(token: &str, jwt_secret: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = ?e, "Rejected auth token.");
            None
        }
    }
}

fn check_password(user: Option<User>, password: &str) -> Result<User, AppError> {
    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

pub async fn login_user(
    db: &Database,
    username: &str,
    password: &str,
    jwt_secret: &str,
) -> Result<(User, IssuedToken), AppError> {
    let user = check_password(user_service::find_by_username(db, username).await?, password)?;
    let token = issue_token(&user, jwt_secret)?;
    info!(user_id = %user.id, role = %user.role, "User logged in.");
    Ok((user, token))
}

pub async fn login_parent(
    db: &Database,
    phone: &str,
    password: &str,
    jwt_secret: &str,
) -> Result<(User, IssuedToken), AppError> {
    let user = check_password(user_service::find_parent_by_phone(db, phone).await?, password)?;
    let token = issue_token(&user, jwt_secret)?;
    info!(user_id = %user.id, "Parent logged in.");
    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn user(role: Role) -> User {
        User {
            id: "u-1".to_string(),
            username: "teacher01".to_string(),
            password_hash: String::new(),
            role,
            name: "이선생".to_string(),
            email: None,
            phone: None,
            student_ids: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let issued = issue_token(&user(Role::Teacher), SECRET).unwrap();
        let claims = verify_token(&issued.token, SECRET).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.username, "teacher01");
        assert_eq!(claims.role, Role::Teacher);
        assert_eq!(claims.name, "이선생");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_parent_tokens_live_longer() {
        assert_eq!(token_ttl(Role::Parent), Duration::days(30));
        assert_eq!(token_ttl(Role::Admin), Duration::hours(24));
        let issued = issue_token(&user(Role::Parent), SECRET).unwrap();
        let claims = verify_token(&issued.token, SECRET).unwrap();
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued_at = Utc::now() - Duration::hours(25);
        let claims = claims_for(&user(Role::Admin), issued_at);
        let token = encode_claims(&claims, SECRET).unwrap();
        assert!(verify_token(&token, SECRET).is_none());
    }

    #[test]
    fn test_wrong_secret_and_garbage_are_rejected() {
        let issued = issue_token(&user(Role::Admin), SECRET).unwrap();
        assert!(verify_token(&issued.token, "other-secret").is_none());
        assert!(verify_token("not.a.token", SECRET).is_none());
    }

    #[test]
    fn test_password_hashing() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("wrong horse", &hashed).unwrap());
    }

    #[test]
    fn test_check_password_hides_missing_user() {
        assert!(matches!(
            check_password(None, "whatever"),
            Err(AppError::InvalidCredentials)
        ));
    }
}
