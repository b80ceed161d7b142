use axum::{
    extract::{Form, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::services::sms_log_service;
use crate::web::models::LogResponse;
use crate::web::{error::AppError, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    message: Option<String>,
    category_id: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_attempted: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    category_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "MessageSid")]
    message_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    message_status: Option<String>,
}

async fn send_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, AppError> {
    let message = payload.message.unwrap_or_default();
    let outcome = app_state
        .broadcast
        .broadcast(&message, payload.category_id)
        .await?;

    info!(
        sent = outcome.sent_count,
        failed = outcome.failed_count,
        total = outcome.total_attempted,
        "broadcast settled"
    );

    Ok(Json(SendResponse {
        success: true,
        sent_count: outcome.sent_count,
        failed_count: outcome.failed_count,
        total_attempted: outcome.total_attempted,
    }))
}

fn parse_history_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| AppError::InvalidInput(format!("Invalid date filter: {raw}")))
}

async fn history_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<LogResponse>>, AppError> {
    let category_id = match params.category_id.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            AppError::InvalidInput(format!("Invalid category id: {raw}"))
        })?),
    };
    let start = params.start_date.as_deref().map(parse_history_date).transpose()?;
    let end = params.end_date.as_deref().map(parse_history_date).transpose()?;

    let logs = sms_log_service::history(&app_state.db, category_id, start, end).await?;
    Ok(Json(logs.into_iter().map(LogResponse::from).collect()))
}

/// Provider status callback. Unauthenticated by necessity, and always
/// succeeds: an unknown sid or an incomplete payload updates zero rows.
async fn webhook_handler(
    State(app_state): State<Arc<AppState>>,
    Form(payload): Form<WebhookPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let (Some(sid), Some(status)) = (payload.message_sid, payload.message_status) {
        let rows = sms_log_service::update_status_by_sid(&app_state.db, &sid, &status).await?;
        info!(sid = %sid, status = %status, rows, "delivery status callback");
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Send and history; the session layer is applied by the caller.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send", post(send_handler))
        .route("/history", get(history_handler))
}

/// The status callback, mounted without the session layer.
pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(webhook_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_dates_accept_rfc3339_and_plain_dates() {
        let ts = parse_history_date("2026-03-01T12:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T12:30:00+00:00");

        let day = parse_history_date("2026-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2026-03-01T00:00:00+00:00");

        assert!(parse_history_date("yesterday").is_err());
    }
}
