use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{
    entities::conversion_event::ConversionEvent,
    new_id,
    services::conversion_service::{self, EventTypeCount},
    timestamp,
};
use crate::web::{
    error::AppError,
    extract::AppJson,
    middleware::session::SessionId,
    response::ApiResponse,
    validation::{self, MAX_SHORT_TEXT},
    AppState,
};

const DEFAULT_STATS_DAYS: i64 = 30;
const MAX_STATS_DAYS: i64 = 365;
const MAX_METADATA_BYTES: usize = 4 * 1024;

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/events", post(track_event))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/stats/conversions", get(conversion_stats))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub event_type: Option<String>,
    pub page: Option<String>,
    pub source: Option<String>,
    pub value: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct ConversionStats {
    pub days: i64,
    pub events: Vec<EventTypeCount>,
}

pub fn build_event(payload: EventRequest, session_id: String) -> Result<ConversionEvent, AppError> {
    let event_type = validation::required(payload.event_type.as_deref(), "이벤트 유형", MAX_SHORT_TEXT)?;
    let metadata = payload.metadata.unwrap_or(serde_json::Value::Null);
    if serde_json::to_vec(&metadata)?.len() > MAX_METADATA_BYTES {
        return Err(AppError::InvalidInput("메타데이터가 너무 큽니다.".to_string()));
    }
    if payload.value.is_some_and(|v| !v.is_finite()) {
        return Err(AppError::InvalidInput("값이 올바르지 않습니다.".to_string()));
    }

    Ok(ConversionEvent {
        id: new_id(),
        event_type,
        session_id,
        page: validation::optional(payload.page.as_deref(), "페이지", MAX_SHORT_TEXT * 5)?,
        source: validation::optional(payload.source.as_deref(), "유입 경로", MAX_SHORT_TEXT)?,
        value: payload.value,
        metadata,
        created_at: timestamp::now(),
    })
}

async fn track_event(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    AppJson(payload): AppJson<EventRequest>,
) -> Result<(StatusCode, ApiResponse<()>), AppError> {
    let event = build_event(payload, session_id)?;
    conversion_service::insert(&app_state.db, &event).await?;
    Ok((StatusCode::CREATED, ApiResponse::message("기록되었습니다.")))
}

async fn conversion_stats(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<ApiResponse<ConversionStats>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS);
    let events = conversion_service::stats_by_type(&app_state.db, days).await?;
    Ok(ApiResponse::ok(ConversionStats { days, events }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EventRequest {
        EventRequest {
            event_type: Some("cta_click".to_string()),
            page: Some("/programs".to_string()),
            source: None,
            value: Some(1.0),
            metadata: Some(serde_json::json!({ "button": "상담 신청" })),
        }
    }

    #[test]
    fn test_event_carries_session() {
        let event = build_event(request(), "sess-1".to_string()).unwrap();
        assert_eq!(event.session_id, "sess-1");
        assert_eq!(event.event_type, "cta_click");
        assert_eq!(event.metadata["button"], "상담 신청");
    }

    #[test]
    fn test_rejects_missing_type_and_oversized_metadata() {
        let mut payload = request();
        payload.event_type = None;
        assert!(build_event(payload, "s".to_string()).is_err());

        let mut payload = request();
        payload.metadata = Some(serde_json::json!({ "blob": "x".repeat(MAX_METADATA_BYTES) }));
        assert!(build_event(payload, "s".to_string()).is_err());
    }
}
