// libs/appointment-cell/src/handlers.rs
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
use shared_utils::clock::parse_clock_time;

use crate::models::{
    BookAppointmentRequest, UpdateAppointmentRequest, RescheduleAppointmentRequest,
    CancelAppointmentRequest, AppointmentSearchQuery, AppointmentStatus, AppointmentError,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub owner_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SlotSuggestionQuery {
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DayScheduleQuery {
    pub owner_id: Uuid,
    pub date: NaiveDate,
}

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => {
            AppError::NotFound("Appointment not found".to_string())
        },
        AppointmentError::PatientNotFound => {
            AppError::NotFound("Patient not found".to_string())
        },
        AppointmentError::ConflictDetected(report) => {
            AppError::SchedulingConflict {
                message: "Appointment time conflicts with the clinician's existing schedule".to_string(),
                conflicts: json!(report),
            }
        },
        AppointmentError::InvalidTime(msg) => {
            AppError::BadRequest(msg)
        },
        AppointmentError::ValidationError(msg) => {
            AppError::BadRequest(msg)
        },
        AppointmentError::InvalidStatusTransition(status) => {
            AppError::BadRequest(format!("Cannot modify appointment in status: {}", status))
        },
        AppointmentError::DatabaseError(msg) => {
            AppError::Internal(msg)
        },
    }
}

// ==============================================================================
// APPOINTMENT BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients book for themselves; clinicians and admins can book for anyone
    let is_own_booking = request.patient_id.to_string() == user.id;

    if !is_own_booking && !user.is_clinician() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to book appointment for this patient".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.book_appointment(request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_owner = appointment.owner_id.to_string() == user.id;

    if !is_patient && !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_owner = appointment.owner_id.to_string() == user.id;

    if !is_patient && !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this appointment".to_string()));
    }

    // Status changes stay with clinicians
    if is_patient && !is_owner && !user.is_admin() && request.status.is_some() {
        return Err(AppError::Auth("Patients cannot update appointment status".to_string()));
    }

    let updated_appointment = booking_service.update_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated_appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_owner = appointment.owner_id.to_string() == user.id;

    if !is_patient && !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to reschedule this appointment".to_string()));
    }

    let rescheduled_appointment = booking_service.reschedule_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": rescheduled_appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_owner = appointment.owner_id.to_string() == user.id;

    if !is_patient && !is_owner && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to cancel this appointment".to_string()));
    }

    let cancelled_appointment = booking_service.cancel_appointment(appointment_id, request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled_appointment,
        "message": "Appointment cancelled successfully"
    })))
}

// ==============================================================================
// APPOINTMENT SEARCH AND LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let mut search_query = AppointmentSearchQuery {
        owner_id: params.owner_id,
        patient_id: params.patient_id,
        status: params.status,
        from_date: params.from_date,
        to_date: params.to_date,
        limit: params.limit,
        offset: params.offset,
    };

    // Non-admins only ever see their own appointments
    if !user.is_admin() {
        if user.is_clinician() {
            if let Ok(owner_uuid) = Uuid::parse_str(&user.id) {
                search_query.owner_id = Some(owner_uuid);
            }
        } else {
            if let Ok(patient_uuid) = Uuid::parse_str(&user.id) {
                search_query.patient_id = Some(patient_uuid);
            }
        }
    }

    let appointments = booking_service.search_appointments(search_query, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
        "limit": params.limit,
        "offset": params.offset
    })))
}

#[axum::debug_handler]
pub async fn get_day_schedule(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<DayScheduleQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_schedule = params.owner_id.to_string() == user.id;
    if !is_own_schedule && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this clinician's schedule".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);

    let (appointments, time_blocks) = booking_service
        .get_day_schedule(params.owner_id, params.date, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "owner_id": params.owner_id,
        "date": params.date,
        "appointments": appointments,
        "time_blocks": time_blocks
    })))
}

// ==============================================================================
// CONFLICT DETECTION AND UTILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ConflictCheckQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let start_minutes = parse_clock_time(&params.time)
        .map_err(AppError::BadRequest)?;

    if params.duration_minutes <= 0 {
        return Err(AppError::BadRequest("Duration must be positive".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);

    let report = booking_service.conflict_service()
        .check_slot(
            params.owner_id,
            params.date,
            start_minutes,
            params.duration_minutes,
            params.exclude_appointment_id,
            token,
        )
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn suggest_appointment_slots(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<SlotSuggestionQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if params.duration_minutes <= 0 {
        return Err(AppError::BadRequest("Duration must be positive".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);

    let suggestions = booking_service.conflict_service()
        .suggest_slots(
            params.owner_id,
            params.date,
            params.duration_minutes,
            params.limit,
            token,
        )
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "owner_id": params.owner_id,
        "date": params.date,
        "suggested_slots": suggestions
    })))
}
