use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use serde::Deserialize;
use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateTimeBlockRequest, UpdateTimeBlockRequest, TimeBlockError};
use crate::services::TimeBlockService;

#[derive(Debug, Deserialize)]
pub struct TimeBlockListQuery {
    pub owner_id: Uuid,
    pub date: NaiveDate,
}

fn map_time_block_error(e: TimeBlockError) -> AppError {
    match e {
        TimeBlockError::NotFound => AppError::NotFound("Time block not found".to_string()),
        TimeBlockError::ValidationError(msg) => AppError::BadRequest(msg),
        TimeBlockError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn create_time_block(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateTimeBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Clinicians block out their own calendar; admins can block anyone's
    let is_own_calendar = request.owner_id.to_string() == user.id;

    if !(user.is_admin() || (user.is_clinician() && is_own_calendar)) {
        return Err(AppError::Auth("Not authorized to create time blocks for this clinician".to_string()));
    }

    let service = TimeBlockService::new(&state);

    let block = service.create_time_block(request, token).await
        .map_err(map_time_block_error)?;

    Ok(Json(json!({
        "success": true,
        "time_block": block,
        "message": "Time block created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_time_blocks(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<TimeBlockListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_calendar = params.owner_id.to_string() == user.id;
    if !user.is_admin() && !is_own_calendar {
        return Err(AppError::Auth("Not authorized to view time blocks for this clinician".to_string()));
    }

    let service = TimeBlockService::new(&state);

    let blocks = service.list_for_day(params.owner_id, params.date, token).await
        .map_err(map_time_block_error)?;

    Ok(Json(json!({
        "owner_id": params.owner_id,
        "date": params.date,
        "time_blocks": blocks,
        "total": blocks.len()
    })))
}

#[axum::debug_handler]
pub async fn get_time_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TimeBlockService::new(&state);

    let block = service.get_time_block(block_id, token).await
        .map_err(map_time_block_error)?;

    let is_owner = block.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this time block".to_string()));
    }

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn update_time_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateTimeBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TimeBlockService::new(&state);

    let block = service.get_time_block(block_id, token).await
        .map_err(map_time_block_error)?;

    let is_owner = block.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this time block".to_string()));
    }

    let updated = service.update_time_block(block_id, request, token).await
        .map_err(map_time_block_error)?;

    Ok(Json(json!({
        "success": true,
        "time_block": updated,
        "message": "Time block updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_time_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TimeBlockService::new(&state);

    let block = service.get_time_block(block_id, token).await
        .map_err(map_time_block_error)?;

    let is_owner = block.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to delete this time block".to_string()));
    }

    let deleted = service.delete_time_block(block_id, token).await
        .map_err(map_time_block_error)?;

    Ok(Json(json!({
        "success": true,
        "time_block": deleted,
        "message": "Time block deleted successfully"
    })))
}
