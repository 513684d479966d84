// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_utils::clock::parse_clock_time;
use time_block_cell::models::TimeBlock;

use crate::models::{
    Appointment, AppointmentStatus, AppointmentError, AppointmentSearchQuery,
    BookAppointmentRequest, UpdateAppointmentRequest, RescheduleAppointmentRequest,
    CancelAppointmentRequest, SchedulingRules,
};
use crate::services::conflict::ConflictDetectionService;

pub struct AppointmentBookingService {
    store: Arc<StoreClient>,
    conflict_service: ConflictDetectionService,
    rules: SchedulingRules,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(StoreClient::new(config));
        let conflict_service = ConflictDetectionService::new(Arc::clone(&store));

        Self {
            store,
            conflict_service,
            rules: SchedulingRules::default(),
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    /// Book a new appointment. The slot is checked against the clinician's
    /// existing appointments and time blocks for that date; the record is
    /// only written when the check comes back clean.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} with clinician {} on {} at {}",
              request.patient_id, request.owner_id, request.date, request.time);

        let start_minutes = self.validate_slot_fields(&request.time, request.duration_minutes)?;

        self.verify_patient_exists(request.patient_id, auth_token).await?;

        let report = self.conflict_service.check_slot(
            request.owner_id,
            request.date,
            start_minutes,
            request.duration_minutes,
            None,
            auth_token,
        ).await?;

        if report.has_conflict {
            warn!("Appointment conflict detected for clinician {} on {} at {}",
                  request.owner_id, request.date, request.time);
            return Err(AppointmentError::ConflictDetected(report));
        }

        let appointment_data = json!({
            "owner_id": request.owner_id,
            "patient_id": request.patient_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time,
            "duration_minutes": request.duration_minutes,
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError("Failed to create appointment".to_string()));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} booked successfully with clinician {}",
              appointment.id, appointment.owner_id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Update appointment fields. Whenever the date, time, or duration moves,
    /// the merged slot is re-checked with the appointment's own id excluded
    /// so it does not collide with itself.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        let slot_changed = request.date.is_some()
            || request.time.is_some()
            || request.duration_minutes.is_some();

        if slot_changed {
            let date = request.date.unwrap_or(current.date);
            let time = request.time.clone().unwrap_or_else(|| current.time.clone());
            let duration_minutes = request.duration_minutes.unwrap_or(current.duration_minutes);

            let start_minutes = self.validate_slot_fields(&time, duration_minutes)?;

            let report = self.conflict_service.check_slot(
                current.owner_id,
                date,
                start_minutes,
                duration_minutes,
                Some(appointment_id),
                auth_token,
            ).await?;

            if report.has_conflict {
                warn!("Update of appointment {} rejected: slot conflict", appointment_id);
                return Err(AppointmentError::ConflictDetected(report));
            }
        }

        let mut update_data = serde_json::Map::new();

        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(date) = request.date {
            update_data.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(time) = request.time {
            update_data.insert("time".to_string(), json!(time));
        }
        if let Some(duration_minutes) = request.duration_minutes {
            update_data.insert("duration_minutes".to_string(), json!(duration_minutes));
        }
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await
    }

    /// Move an appointment to a new slot, excluding its own prior record
    /// from the conflict check so an in-place or adjacent move succeeds.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.status == AppointmentStatus::Cancelled {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let date = request.date.unwrap_or(current.date);
        let duration_minutes = request.duration_minutes.unwrap_or(current.duration_minutes);
        let start_minutes = self.validate_slot_fields(&request.time, duration_minutes)?;

        let report = self.conflict_service.check_slot(
            current.owner_id,
            date,
            start_minutes,
            duration_minutes,
            Some(appointment_id),
            auth_token,
        ).await?;

        if report.has_conflict {
            warn!("Reschedule of appointment {} rejected: slot conflict", appointment_id);
            return Err(AppointmentError::ConflictDetected(report));
        }

        let update_data = json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "time": request.time,
            "duration_minutes": duration_minutes,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rescheduled = self.patch_appointment(appointment_id, update_data, auth_token).await?;

        info!("Appointment {} rescheduled to {} at {}", appointment_id, date, rescheduled.time);
        Ok(rescheduled)
    }

    /// Cancel an appointment. Once cancelled the slot is free again; the
    /// conflict checker ignores cancelled rows.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.status == AppointmentStatus::Cancelled {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(AppointmentStatus::Cancelled));
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let cancelled = self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = Vec::new();

        if let Some(owner_id) = query.owner_id {
            query_parts.push(format!("owner_id=eq.{}", owner_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            query_parts.push(format!("date=gte.{}", from_date.format("%Y-%m-%d")));
        }
        if let Some(to_date) = query.to_date {
            query_parts.push(format!("date=lte.{}", to_date.format("%Y-%m-%d")));
        }

        query_parts.push(format!("limit={}", query.limit.unwrap_or(50)));
        query_parts.push(format!("offset={}", query.offset.unwrap_or(0)));
        query_parts.push("order=date.asc,time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|apt| serde_json::from_value(apt))
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    /// A clinician's full calendar for one date: appointments plus blocks.
    pub async fn get_day_schedule(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, Vec<TimeBlock>), AppointmentError> {
        let appointments = self.conflict_service.appointments_for_day(owner_id, date, auth_token).await?;
        let time_blocks = self.conflict_service.time_blocks_for_day(owner_id, date, auth_token).await?;

        Ok((appointments, time_blocks))
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    fn validate_slot_fields(&self, time: &str, duration_minutes: i32) -> Result<i32, AppointmentError> {
        let start_minutes = parse_clock_time(time)
            .map_err(AppointmentError::InvalidTime)?;

        if duration_minutes < self.rules.min_appointment_duration {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment duration must be at least {} minutes",
                self.rules.min_appointment_duration
            )));
        }
        if duration_minutes > self.rules.max_appointment_duration {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment duration must be at most {} minutes",
                self.rules.max_appointment_duration
            )));
        }

        Ok(start_minutes)
    }

    async fn verify_patient_exists(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::PatientNotFound);
        }

        Ok(())
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}
