// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

use shared_utils::clock::parse_clock_time;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Minute-offset interval `[start, start + duration)` for overlap checks.
    ///
    /// None when the stored time string is unusable or the duration is not
    /// positive; writes validate both, so such a row cannot be compared and
    /// is skipped by the checker.
    pub fn interval_minutes(&self) -> Option<(i32, i32)> {
        let start = parse_clock_time(&self.time).ok()?;
        (self.duration_minutes > 0).then(|| (start, start + self.duration_minutes))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// A candidate slot on one clinician's calendar, as minute offsets since
/// midnight. Derived from validated input, never persisted.
/// Invariant: `end_minutes > start_minutes`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    pub date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
}

impl TimeInterval {
    pub fn from_start_duration(date: NaiveDate, start_minutes: i32, duration_minutes: i32) -> Self {
        Self {
            date,
            start_minutes,
            end_minutes: start_minutes + duration_minutes,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub time: String,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub owner_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingAppointment {
    pub id: Uuid,
    pub time: String,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingTimeBlock {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
}

/// Everything a caller needs to explain a rejected slot: which appointments
/// and which blocked-out spans collide with the candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub appointments: Vec<ConflictingAppointment>,
    pub time_blocks: Vec<ConflictingTimeBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedSlot {
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SchedulingRules {
    pub min_appointment_duration: i32,
    pub max_appointment_duration: i32,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            min_appointment_duration: 5,
            max_appointment_duration: 480,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Appointment conflicts with an existing booking or time block")]
    ConflictDetected(ConflictReport),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
