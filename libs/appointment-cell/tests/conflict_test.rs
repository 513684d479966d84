use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus, TimeInterval};
use appointment_cell::services::conflict::{build_conflict_report, has_conflict, intervals_overlap};
use shared_utils::clock::parse_clock_time;
use time_block_cell::models::{BlockType, TimeBlock};

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn owner_id() -> Uuid {
    Uuid::parse_str("6a0d2f4e-8c1b-4f3a-9e5d-1b2c3d4e5f60").unwrap()
}

fn appointment_at(time: &str, duration_minutes: i32, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        owner_id: owner_id(),
        patient_id: Uuid::new_v4(),
        date: test_date(),
        time: time.to_string(),
        duration_minutes,
        status,
        reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn block_at(start_time: &str, end_time: &str, reason: &str) -> TimeBlock {
    TimeBlock {
        id: Uuid::new_v4(),
        owner_id: owner_id(),
        date: test_date(),
        start_time: start_time.to_string(),
        end_time: end_time.to_string(),
        reason: reason.to_string(),
        block_type: BlockType::Break,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn candidate(time: &str, duration_minutes: i32) -> TimeInterval {
    let start = parse_clock_time(time).unwrap();
    TimeInterval::from_start_duration(test_date(), start, duration_minutes)
}

// ==============================================================================
// PURE OVERLAP SEMANTICS
// ==============================================================================

#[test]
fn overlap_is_half_open() {
    // [600, 660) vs [660, 690): touching, not overlapping
    assert!(!intervals_overlap(600, 660, 660, 690));
    assert!(!intervals_overlap(660, 690, 600, 660));

    // One shared minute is enough
    assert!(intervals_overlap(600, 661, 660, 690));
}

#[test]
fn no_conflict_when_candidate_entirely_before_or_after() {
    let existing = vec![appointment_at("10:00", 60, AppointmentStatus::Scheduled)];

    assert!(!has_conflict(&candidate("08:00", 60), &existing, &[], None));
    assert!(!has_conflict(&candidate("12:00", 60), &existing, &[], None));
}

#[test]
fn no_conflict_when_intervals_touch() {
    let existing = vec![appointment_at("10:00", 60, AppointmentStatus::Scheduled)];

    // Candidate ends exactly when the existing appointment starts
    assert!(!has_conflict(&candidate("09:00", 60), &existing, &[], None));
    // Candidate starts exactly when the existing appointment ends
    assert!(!has_conflict(&candidate("11:00", 30), &existing, &[], None));
}

#[test]
fn conflict_on_any_positive_length_overlap() {
    let existing = vec![appointment_at("10:00", 60, AppointmentStatus::Scheduled)];

    // Partial overlap on the leading edge
    assert!(has_conflict(&candidate("09:30", 60), &existing, &[], None));
    // Partial overlap on the trailing edge
    assert!(has_conflict(&candidate("10:30", 60), &existing, &[], None));
    // Candidate fully inside the existing appointment
    assert!(has_conflict(&candidate("10:15", 30), &existing, &[], None));
    // Candidate fully containing the existing appointment
    assert!(has_conflict(&candidate("09:30", 120), &existing, &[], None));
    // Identical span
    assert!(has_conflict(&candidate("10:00", 60), &existing, &[], None));
}

#[test]
fn cancelled_appointments_never_conflict() {
    let existing = vec![appointment_at("10:00", 60, AppointmentStatus::Cancelled)];

    // Fully overlapping cancelled appointment leaves the slot free
    assert!(!has_conflict(&candidate("10:00", 60), &existing, &[], None));
}

#[test]
fn completed_and_no_show_appointments_still_occupy_their_slot() {
    let completed = vec![appointment_at("10:00", 60, AppointmentStatus::Completed)];
    let no_show = vec![appointment_at("10:00", 60, AppointmentStatus::NoShow)];

    assert!(has_conflict(&candidate("10:30", 30), &completed, &[], None));
    assert!(has_conflict(&candidate("10:30", 30), &no_show, &[], None));
}

#[test]
fn excluding_own_record_prevents_self_conflict() {
    // Rescheduling appointment A1 from 09:00 to 09:30 (same duration) must
    // not collide with A1's own prior slot.
    let a1 = appointment_at("09:00", 30, AppointmentStatus::Scheduled);
    let a1_id = a1.id;
    let existing = vec![a1];

    assert!(has_conflict(&candidate("09:00", 30), &existing, &[], None));
    assert!(!has_conflict(&candidate("09:00", 30), &existing, &[], Some(a1_id)));
    assert!(!has_conflict(&candidate("09:30", 30), &existing, &[], Some(a1_id)));
}

#[test]
fn unknown_exclude_id_is_a_harmless_no_op() {
    let existing = vec![appointment_at("10:00", 60, AppointmentStatus::Scheduled)];

    assert!(has_conflict(&candidate("10:00", 60), &existing, &[], Some(Uuid::new_v4())));
}

#[test]
fn time_blocks_always_conflict_regardless_of_exclude_id() {
    let blocks = vec![block_at("13:00", "14:00", "Lunch")];

    assert!(has_conflict(&candidate("13:30", 30), &[], &blocks, None));
    // The exclude id never applies to blocks
    assert!(has_conflict(&candidate("13:30", 30), &[], &blocks, Some(Uuid::new_v4())));
}

#[test]
fn time_blocks_use_the_same_half_open_rule() {
    let blocks = vec![block_at("13:00", "14:00", "Lunch")];

    assert!(!has_conflict(&candidate("12:00", 60), &[], &blocks, None));
    assert!(!has_conflict(&candidate("14:00", 30), &[], &blocks, None));
    assert!(has_conflict(&candidate("13:59", 10), &[], &blocks, None));
}

#[test]
fn empty_calendars_never_conflict() {
    assert!(!has_conflict(&candidate("00:00", 30), &[], &[], None));
    assert!(!has_conflict(&candidate("23:00", 59), &[], &[], None));
}

#[test]
fn first_conflict_wins_across_both_collections() {
    let existing = vec![
        appointment_at("08:00", 30, AppointmentStatus::Scheduled),
        appointment_at("10:00", 60, AppointmentStatus::Confirmed),
    ];
    let blocks = vec![block_at("12:00", "13:00", "Meeting")];

    assert!(has_conflict(&candidate("10:30", 120), &existing, &blocks, None));
}

// ==============================================================================
// CONFLICT REPORT DETAILS
// ==============================================================================

#[test]
fn report_names_every_colliding_record() {
    let appointments = vec![
        appointment_at("10:00", 60, AppointmentStatus::Scheduled),
        appointment_at("11:00", 30, AppointmentStatus::Confirmed),
        appointment_at("10:00", 60, AppointmentStatus::Cancelled),
    ];
    let blocks = vec![
        block_at("11:00", "12:00", "Team meeting"),
        block_at("15:00", "16:00", "Admin"),
    ];

    let report = build_conflict_report(&candidate("10:30", 60), &appointments, &blocks, None);

    assert!(report.has_conflict);
    // The cancelled row is skipped; the other two overlap 10:30-11:30
    assert_eq!(report.appointments.len(), 2);
    // Only the 11:00-12:00 block collides
    assert_eq!(report.time_blocks.len(), 1);
    assert_eq!(report.time_blocks[0].reason, "Team meeting");
}

#[test]
fn report_is_clean_for_a_free_slot() {
    let appointments = vec![appointment_at("08:00", 30, AppointmentStatus::Scheduled)];
    let blocks = vec![block_at("12:00", "13:00", "Lunch")];

    let report = build_conflict_report(&candidate("09:00", 60), &appointments, &blocks, None);

    assert!(!report.has_conflict);
    assert!(report.appointments.is_empty());
    assert!(report.time_blocks.is_empty());
}

#[test]
fn report_excludes_the_rescheduled_appointment_itself() {
    let a1 = appointment_at("09:00", 30, AppointmentStatus::Scheduled);
    let a1_id = a1.id;

    let report = build_conflict_report(&candidate("09:15", 30), &[a1], &[], Some(a1_id));

    assert!(!report.has_conflict);
}
