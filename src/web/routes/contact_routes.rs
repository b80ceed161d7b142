use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{EntityTrait, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::entities::category;
use crate::db::services::contact_service;
use crate::validation::{is_valid_e164, normalize_phone_number, sanitize_bulk_entries};
use crate::web::models::CategoryResponse;
use crate::web::{error::AppError, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    phone_number: Option<String>,
    category_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct DeleteContactParams {
    id: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkContactEntry {
    phone_number: String,
    category_id: i32,
}

#[derive(Deserialize)]
pub struct BulkImportRequest {
    #[serde(default)]
    contacts: Vec<BulkContactEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: i32,
    pub phone_number: String,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub category: Option<CategoryResponse>,
}

async fn list_contacts_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContactResponse>>, AppError> {
    let contacts = contact_service::list_with_category(&app_state.db).await?;
    let response = contacts
        .into_iter()
        .map(|(contact, category)| ContactResponse {
            id: contact.id,
            phone_number: contact.phone_number,
            category_id: contact.category_id,
            created_at: contact.created_at,
            category: category.map(CategoryResponse::from),
        })
        .collect();
    Ok(Json(response))
}

async fn create_contact_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let (phone_number, category_id) = match (payload.phone_number, payload.category_id) {
        (Some(phone), Some(category_id)) if !phone.is_empty() => (phone, category_id),
        _ => {
            return Err(AppError::InvalidInput(
                "Phone number and category are required".to_string(),
            ));
        }
    };

    let normalized = normalize_phone_number(&phone_number);
    if !is_valid_e164(&normalized) {
        return Err(AppError::InvalidInput(
            "Invalid phone number format. Use E.164 format (e.g., +1234567890)".to_string(),
        ));
    }

    let contact = contact_service::create_contact(&app_state.db, &normalized, category_id)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A contact with this phone number already exists".to_string())
            }
            _ => AppError::from(err),
        })?;

    let category = category::Entity::find_by_id(contact.category_id)
        .one(&app_state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id: contact.id,
            phone_number: contact.phone_number,
            category_id: contact.category_id,
            created_at: contact.created_at,
            category: category.map(CategoryResponse::from),
        }),
    ))
}

async fn delete_contact_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<DeleteContactParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::InvalidInput("Contact ID is required".to_string()))?;

    contact_service::delete_contact(&app_state.db, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Bulk import: invalid rows are dropped silently, duplicates skipped at the
/// database. The reported count is the number of rows actually inserted.
async fn bulk_import_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if payload.contacts.is_empty() {
        return Err(AppError::InvalidInput(
            "Contacts array is required".to_string(),
        ));
    }

    let survivors = sanitize_bulk_entries(
        payload
            .contacts
            .iter()
            .map(|entry| (entry.phone_number.as_str(), entry.category_id)),
    );
    let inserted = contact_service::bulk_insert(&app_state.db, &survivors).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "count": inserted })),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_contacts_handler)
                .post(create_contact_handler)
                .delete(delete_contact_handler),
        )
        .route("/bulk", post(bulk_import_handler))
}
