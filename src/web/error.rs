use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;
use tracing::error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Too many requests, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Upstream provider error: {0}")]
    UpstreamError(String),
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseUnavailable(_)
            | AppError::DatabaseError(_)
            | AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::UpstreamError(msg) => msg.clone(),
            AppError::InvalidCredentials => "아이디 또는 비밀번호가 올바르지 않습니다.".to_string(),
            AppError::RateLimited { .. } => {
                "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.".to_string()
            }
            AppError::DatabaseUnavailable(raw) => friendly_database_message(raw)
                .unwrap_or("데이터베이스에 연결할 수 없습니다. 잠시 후 다시 시도해주세요.")
                .to_string(),
            AppError::DatabaseError(_)
            | AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::InternalServerError(_) => "서버 오류가 발생했습니다.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed.");
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.client_message(),
        });

        if let AppError::RateLimited { retry_after } = self {
            body["retryAfter"] = serde_json::json!(retry_after);
            let mut response = (status, Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            return response;
        }

        (status, Json(body)).into_response()
    }
}

/// Fallback classifier for driver messages that carry no typed kind.
pub fn friendly_database_message(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("enotfound") || lowered.contains("failed to lookup address") {
        Some("데이터베이스 호스트를 찾을 수 없습니다.")
    } else if lowered.contains("econnrefused") || lowered.contains("connection refused") {
        Some("데이터베이스 연결이 거부되었습니다.")
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        Some("데이터베이스 응답 시간이 초과되었습니다.")
    } else {
        None
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return AppError::Conflict("이미 등록된 항목입니다.".to_string());
        }
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => {
                AppError::DatabaseUnavailable(err.to_string())
            }
            _ => match friendly_database_message(&err.to_string()) {
                Some(_) => AppError::DatabaseUnavailable(err.to_string()),
                None => AppError::DatabaseError(err.to_string()),
            },
        }
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalServerError(format!("BSON serialization error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = AppError::InvalidInput("이름을 입력해주세요.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "이름을 입력해주세요.");
    }

    #[tokio::test]
    async fn test_rate_limited_carries_retry_after() {
        let response = AppError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], 42);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::DatabaseError("E42 collection dropped".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "서버 오류가 발생했습니다.");
    }

    #[test]
    fn test_friendly_database_message() {
        assert!(friendly_database_message("getaddrinfo ENOTFOUND cluster0.mongodb.net").is_some());
        assert!(friendly_database_message("Connection refused (os error 111)").is_some());
        assert!(friendly_database_message("Server selection timeout").is_some());
        assert!(friendly_database_message("document failed validation").is_none());
    }
}
