use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::notifications::service::DeliveryReport;

/// The `{ success, data?, error?, message? }` envelope every route answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Envelope for submissions that notify staff: delivery flags sit beside `data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub message: String,
    pub email_sent: bool,
    pub sms_sent: bool,
}

impl<T: Serialize> NotifiedResponse<T> {
    pub fn new(data: T, message: impl Into<String>, report: DeliveryReport) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            email_sent: report.email_sent,
            sms_sent: report.sms_sent,
        }
    }
}

impl<T: Serialize> IntoResponse for NotifiedResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A page of results plus the total count for pagination controls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}
