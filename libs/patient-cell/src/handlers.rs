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

use crate::models::{CreatePatientRequest, UpdatePatientRequest, PatientError};
use crate::services::PatientService;

#[derive(Debug, Deserialize)]
pub struct PatientSearchParams {
    pub q: String,
    pub limit: Option<i32>,
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::AlreadyExists(email) => {
            AppError::Conflict(format!("Patient with email {} already exists", email))
        },
        PatientError::ValidationError(msg) => AppError::BadRequest(msg),
        PatientError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_clinician() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to create patient records".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.create_patient(request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient record created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients may only read their own record
    let is_own_record = patient_id.to_string() == user.id;
    if !is_own_record && !user.is_clinician() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this patient record".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.get_patient(patient_id, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_record = patient_id.to_string() == user.id;
    if !is_own_record && !user.is_clinician() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this patient record".to_string()));
    }

    // Clinical notes stay with clinicians
    if is_own_record && !user.is_clinician() && !user.is_admin() && request.notes.is_some() {
        return Err(AppError::Auth("Patients cannot update clinical notes".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.update_patient(patient_id, request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient record updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can delete patient records".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.delete_patient(patient_id, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient record deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<PatientSearchParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_clinician() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to search patient records".to_string()));
    }

    let service = PatientService::new(&state);

    let patients = service.search_patients(&params.q, params.limit, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}
