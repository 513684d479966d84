use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{
    CreateNoteTemplateRequest, UpdateNoteTemplateRequest,
    CreateTranscriptRequest, UpdateTranscriptRequest, DocumentationError,
};
use crate::services::{NoteTemplateService, TranscriptService};

#[derive(Debug, Deserialize)]
pub struct TemplateListQuery {
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptListQuery {
    pub patient_id: Uuid,
    pub owner_id: Option<Uuid>,
}

fn map_documentation_error(e: DocumentationError) -> AppError {
    match e {
        DocumentationError::TemplateNotFound => AppError::NotFound("Note template not found".to_string()),
        DocumentationError::TranscriptNotFound => AppError::NotFound("Transcript not found".to_string()),
        DocumentationError::ValidationError(msg) => AppError::BadRequest(msg),
        DocumentationError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// NOTE TEMPLATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_template(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateNoteTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_template = request.owner_id.to_string() == user.id;
    if !(user.is_admin() || (user.is_clinician() && is_own_template)) {
        return Err(AppError::Auth("Not authorized to create templates for this clinician".to_string()));
    }

    let service = NoteTemplateService::new(&state);

    let template = service.create_template(request, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "template": template,
        "message": "Note template created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<TemplateListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_templates = params.owner_id.to_string() == user.id;
    if !is_own_templates && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view templates for this clinician".to_string()));
    }

    let service = NoteTemplateService::new(&state);

    let templates = service.list_templates(params.owner_id, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "templates": templates,
        "total": templates.len()
    })))
}

#[axum::debug_handler]
pub async fn get_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NoteTemplateService::new(&state);

    let template = service.get_template(template_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = template.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this template".to_string()));
    }

    Ok(Json(json!(template)))
}

#[axum::debug_handler]
pub async fn update_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateNoteTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NoteTemplateService::new(&state);

    let template = service.get_template(template_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = template.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this template".to_string()));
    }

    let updated = service.update_template(template_id, request, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "template": updated,
        "message": "Note template updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NoteTemplateService::new(&state);

    let template = service.get_template(template_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = template.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to delete this template".to_string()));
    }

    let deleted = service.delete_template(template_id, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "template": deleted,
        "message": "Note template deleted successfully"
    })))
}

// ==============================================================================
// TRANSCRIPT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_transcript(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateTranscriptRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_transcript = request.owner_id.to_string() == user.id;
    if !(user.is_admin() || (user.is_clinician() && is_own_transcript)) {
        return Err(AppError::Auth("Not authorized to create transcripts for this clinician".to_string()));
    }

    let service = TranscriptService::new(&state);

    let transcript = service.create_transcript(request, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "transcript": transcript,
        "message": "Transcript created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_transcripts(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<TranscriptListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients read their own history; clinicians read what they authored
    let is_own_history = params.patient_id.to_string() == user.id;

    let mut owner_filter = params.owner_id;
    if !user.is_admin() && !is_own_history {
        if !user.is_clinician() {
            return Err(AppError::Auth("Not authorized to view transcripts for this patient".to_string()));
        }
        if let Ok(owner_uuid) = Uuid::parse_str(&user.id) {
            owner_filter = Some(owner_uuid);
        }
    }

    let service = TranscriptService::new(&state);

    let transcripts = service.list_for_patient(params.patient_id, owner_filter, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "patient_id": params.patient_id,
        "transcripts": transcripts,
        "total": transcripts.len()
    })))
}

#[axum::debug_handler]
pub async fn get_transcript(
    State(state): State<Arc<AppConfig>>,
    Path(transcript_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TranscriptService::new(&state);

    let transcript = service.get_transcript(transcript_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = transcript.owner_id.to_string() == user.id;
    let is_subject = transcript.patient_id.to_string() == user.id;

    if !is_owner && !is_subject && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this transcript".to_string()));
    }

    Ok(Json(json!(transcript)))
}

#[axum::debug_handler]
pub async fn update_transcript(
    State(state): State<Arc<AppConfig>>,
    Path(transcript_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateTranscriptRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TranscriptService::new(&state);

    let transcript = service.get_transcript(transcript_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = transcript.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this transcript".to_string()));
    }

    let updated = service.update_transcript(transcript_id, request, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "transcript": updated,
        "message": "Transcript updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_transcript(
    State(state): State<Arc<AppConfig>>,
    Path(transcript_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TranscriptService::new(&state);

    let transcript = service.get_transcript(transcript_id, token).await
        .map_err(map_documentation_error)?;

    let is_owner = transcript.owner_id.to_string() == user.id;
    if !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to delete this transcript".to_string()));
    }

    let deleted = service.delete_transcript(transcript_id, token).await
        .map_err(map_documentation_error)?;

    Ok(Json(json!({
        "success": true,
        "transcript": deleted,
        "message": "Transcript deleted successfully"
    })))
}
