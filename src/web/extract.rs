use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::web::error::AppError;

/// `Json` whose rejections become the 400 envelope instead of axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(format!("잘못된 요청 형식입니다: {}", rejection.body_text()))
    }
}
