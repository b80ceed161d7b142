use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sea_orm::SqlErr;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::category_service;
use crate::web::models::CategoryResponse;
use crate::web::{error::AppError, AppState};

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    name: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteCategoryParams {
    id: Option<i32>,
}

async fn list_categories_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = category_service::list_categories(&app_state.db).await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

async fn create_category_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let name = payload
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Category name is required".to_string()))?;

    let category = category_service::create_category(&app_state.db, &name)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Category already exists".to_string())
            }
            _ => AppError::from(err),
        })?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

async fn delete_category_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<DeleteCategoryParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::InvalidInput("Category ID is required".to_string()))?;

    // Idempotent: deleting an id that no longer exists is still a success.
    category_service::delete_category(&app_state.db, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/",
        get(list_categories_handler)
            .post(create_category_handler)
            .delete(delete_category_handler),
    )
}
