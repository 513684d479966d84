// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::StoreClient;
use shared_utils::clock::format_clock_time;
use time_block_cell::models::TimeBlock;

use crate::models::{
    Appointment, AppointmentStatus, AppointmentError, ConflictReport,
    ConflictingAppointment, ConflictingTimeBlock, SuggestedSlot, TimeInterval,
};

/// Working-day window scanned when suggesting free slots.
const WORK_DAY_START_MINUTES: i32 = 8 * 60;
const WORK_DAY_END_MINUTES: i32 = 18 * 60;
const SUGGESTION_STEP_MINUTES: i32 = 15;
const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Half-open interval overlap: `[start_a, end_a)` and `[start_b, end_b)`
/// collide iff each starts before the other ends. Touching intervals do not
/// overlap, which is what allows back-to-back appointments.
pub fn intervals_overlap(start_a: i32, end_a: i32, start_b: i32, end_b: i32) -> bool {
    start_a < end_b && start_b < end_a
}

/// Decide whether a candidate slot collides with any of a clinician's
/// existing commitments on one date.
///
/// Both collections must already be filtered to the candidate's owner and
/// date; this function does not re-filter. Appointments matching
/// `exclude_appointment_id` are skipped (reschedule-in-place), as are
/// cancelled appointments. Time blocks always participate and are never
/// excluded. Returns true on the first overlap found.
pub fn has_conflict(
    candidate: &TimeInterval,
    existing_appointments: &[Appointment],
    existing_time_blocks: &[TimeBlock],
    exclude_appointment_id: Option<Uuid>,
) -> bool {
    for appointment in existing_appointments {
        if Some(appointment.id) == exclude_appointment_id {
            continue;
        }
        if appointment.status == AppointmentStatus::Cancelled {
            continue;
        }
        let Some((start, end)) = appointment.interval_minutes() else {
            continue;
        };
        if intervals_overlap(candidate.start_minutes, candidate.end_minutes, start, end) {
            return true;
        }
    }

    for block in existing_time_blocks {
        let Some((start, end)) = block.interval_minutes() else {
            continue;
        };
        if intervals_overlap(candidate.start_minutes, candidate.end_minutes, start, end) {
            return true;
        }
    }

    false
}

/// Collect every colliding record, using the same skip rules as
/// [`has_conflict`], so rejections can name what the candidate ran into.
pub fn build_conflict_report(
    candidate: &TimeInterval,
    existing_appointments: &[Appointment],
    existing_time_blocks: &[TimeBlock],
    exclude_appointment_id: Option<Uuid>,
) -> ConflictReport {
    let mut conflicting_appointments = Vec::new();
    let mut conflicting_blocks = Vec::new();

    for appointment in existing_appointments {
        if Some(appointment.id) == exclude_appointment_id {
            continue;
        }
        if appointment.status == AppointmentStatus::Cancelled {
            continue;
        }
        let Some((start, end)) = appointment.interval_minutes() else {
            continue;
        };
        if intervals_overlap(candidate.start_minutes, candidate.end_minutes, start, end) {
            conflicting_appointments.push(ConflictingAppointment {
                id: appointment.id,
                time: appointment.time.clone(),
                duration_minutes: appointment.duration_minutes,
                status: appointment.status.clone(),
            });
        }
    }

    for block in existing_time_blocks {
        let Some((start, end)) = block.interval_minutes() else {
            continue;
        };
        if intervals_overlap(candidate.start_minutes, candidate.end_minutes, start, end) {
            conflicting_blocks.push(ConflictingTimeBlock {
                id: block.id,
                start_time: block.start_time.clone(),
                end_time: block.end_time.clone(),
                reason: block.reason.clone(),
            });
        }
    }

    ConflictReport {
        has_conflict: !conflicting_appointments.is_empty() || !conflicting_blocks.is_empty(),
        appointments: conflicting_appointments,
        time_blocks: conflicting_blocks,
    }
}

pub struct ConflictDetectionService {
    store: Arc<StoreClient>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Check one candidate slot against the clinician's calendar for that
    /// date, fetching current appointments and time blocks from the store.
    pub async fn check_slot(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        start_minutes: i32,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictReport, AppointmentError> {
        debug!("Checking conflicts for clinician {} on {} at {}+{}min",
               owner_id, date, format_clock_time(start_minutes), duration_minutes);

        let appointments = self.appointments_for_day(owner_id, date, auth_token).await?;
        let time_blocks = self.time_blocks_for_day(owner_id, date, auth_token).await?;

        let candidate = TimeInterval::from_start_duration(date, start_minutes, duration_minutes);
        let report = build_conflict_report(&candidate, &appointments, &time_blocks, exclude_appointment_id);

        if report.has_conflict {
            warn!("Conflict detected for clinician {} on {}: {} appointments, {} time blocks",
                  owner_id, date, report.appointments.len(), report.time_blocks.len());
        }

        Ok(report)
    }

    /// Free-slot suggestions for a clinician and date, scanning the working
    /// day in fixed steps with the same overlap rule used for rejections.
    pub async fn suggest_slots(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
        limit: Option<usize>,
        auth_token: &str,
    ) -> Result<Vec<SuggestedSlot>, AppointmentError> {
        debug!("Suggesting slots for clinician {} on {}", owner_id, date);

        let appointments = self.appointments_for_day(owner_id, date, auth_token).await?;
        let time_blocks = self.time_blocks_for_day(owner_id, date, auth_token).await?;

        let limit = limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
        let mut suggestions = Vec::new();
        let mut start = WORK_DAY_START_MINUTES;

        while start + duration_minutes <= WORK_DAY_END_MINUTES && suggestions.len() < limit {
            let candidate = TimeInterval::from_start_duration(date, start, duration_minutes);

            if !has_conflict(&candidate, &appointments, &time_blocks, None) {
                suggestions.push(SuggestedSlot {
                    date,
                    time: format_clock_time(start),
                    duration_minutes,
                });
            }

            start += SUGGESTION_STEP_MINUTES;
        }

        Ok(suggestions)
    }

    /// One clinician's appointments for one calendar date, ordered by start.
    pub async fn appointments_for_day(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?owner_id=eq.{}&date=eq.{}&order=time.asc",
            owner_id,
            date.format("%Y-%m-%d")
        );

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

    /// One clinician's time blocks for one calendar date, ordered by start.
    pub async fn time_blocks_for_day(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeBlock>, AppointmentError> {
        let path = format!(
            "/rest/v1/time_blocks?owner_id=eq.{}&date=eq.{}&order=start_time.asc",
            owner_id,
            date.format("%Y-%m-%d")
        );

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|block| serde_json::from_value(block))
            .collect::<std::result::Result<Vec<TimeBlock>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse time blocks: {}", e)))
    }
}
