use axum::{extract::State, routing::get, Json, Router};
use chrono::{NaiveTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::db::services::{category_service, contact_service, sms_log_service};
use crate::web::models::LogResponse;
use crate::web::{error::AppError, AppState};

const RECENT_LOG_LIMIT: u64 = 5;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub name: String,
    pub contact_count: u64,
    pub message_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_contacts: u64,
    pub total_sent: u64,
    pub sent_today: u64,
    pub delivery_rate: u64,
    pub recent_logs: Vec<LogResponse>,
    pub category_stats: Vec<CategoryStat>,
}

async fn stats_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, AppError> {
    let db = &app_state.db;

    let total_contacts = contact_service::count_contacts(db).await?;
    let total_sent = sms_log_service::total_count(db).await?;

    let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let sent_today = sms_log_service::count_sent_since(db, today_start).await?;

    let delivered = sms_log_service::delivered_count(db).await?;
    let delivery_rate = if total_sent > 0 {
        ((delivered as f64 / total_sent as f64) * 100.0).round() as u64
    } else {
        0
    };

    let recent_logs = sms_log_service::recent_with_category(db, RECENT_LOG_LIMIT)
        .await?
        .into_iter()
        .map(LogResponse::from)
        .collect();

    let mut category_stats = Vec::new();
    for category in category_service::list_categories(db).await? {
        let contact_count = category_service::contact_count(db, category.id).await?;
        let message_count = category_service::message_count(db, category.id).await?;
        category_stats.push(CategoryStat {
            name: category.name,
            contact_count,
            message_count,
        });
    }

    Ok(Json(StatsResponse {
        total_contacts,
        total_sent,
        sent_today,
        delivery_rate,
        recent_logs,
        category_stats,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(stats_handler))
}
