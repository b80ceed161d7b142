use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::entities::{category, sms_log};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub user_id: i32,
    pub exp: usize, // Expiration time (timestamp)
}

/// Authenticated user details, passed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub id: i32,
    pub recipient: String,
    pub message: String,
    pub status: String,
    pub category_id: Option<i32>,
    pub twilio_sid: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub category: Option<CategoryResponse>,
}

impl From<(sms_log::Model, Option<category::Model>)> for LogResponse {
    fn from((log, category): (sms_log::Model, Option<category::Model>)) -> Self {
        Self {
            id: log.id,
            recipient: log.recipient,
            message: log.message,
            status: log.status,
            category_id: log.category_id,
            twilio_sid: log.twilio_sid,
            sent_at: log.sent_at,
            category: category.map(CategoryResponse::from),
        }
    }
}
