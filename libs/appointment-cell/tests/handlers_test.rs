use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils};

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    let auth = Authorization::bearer(token).unwrap();
    TypedHeader(auth)
}

fn create_user_extension(user: &TestUser) -> Extension<AuthUser> {
    Extension(user.to_user())
}

fn test_setup(mock_server: &MockServer) -> (Arc<AppConfig>, TestUser, String) {
    let test_config = TestConfig::with_store_url(&mock_server.uri());
    let config = test_config.to_arc();
    let clinician = TestUser::clinician("clinician@example.com");
    let token = JwtTestUtils::create_test_token(&clinician, &test_config.jwt_secret, None);
    (config, clinician, token)
}

fn appointment_json(id: Uuid, owner_id: Uuid, patient_id: Uuid, time: &str, duration: i32, status: &str) -> Value {
    json!({
        "id": id,
        "owner_id": owner_id,
        "patient_id": patient_id,
        "date": "2025-06-02",
        "time": time,
        "duration_minutes": duration,
        "status": status,
        "reason": null,
        "created_at": "2025-06-01T08:00:00Z",
        "updated_at": "2025-06-01T08:00:00Z"
    })
}

fn patient_json(patient_id: Uuid) -> Value {
    json!({
        "id": patient_id,
        "first_name": "Test",
        "last_name": "Patient",
        "email": "patient@example.com",
        "phone_number": null,
        "date_of_birth": null,
        "notes": null,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

async fn mock_patient_exists(mock_server: &MockServer, patient_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_json(patient_id)])))
        .mount(mock_server)
        .await;
}

async fn mock_day_calendar(mock_server: &MockServer, owner_id: Uuid, appointments: Value, time_blocks: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("owner_id", format!("eq.{}", owner_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointments))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_blocks"))
        .and(query_param("owner_id", format!("eq.{}", owner_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(time_blocks))
        .mount(mock_server)
        .await;
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn book_appointment_succeeds_on_free_slot() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let created_id = Uuid::new_v4();

    mock_patient_exists(&mock_server, patient_id).await;
    mock_day_calendar(&mock_server, owner_id, json!([]), json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_json(created_id, owner_id, patient_id, "10:00", 30, "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    let request = BookAppointmentRequest {
        owner_id,
        patient_id,
        date: test_date(),
        time: "10:00".to_string(),
        duration_minutes: 30,
        reason: Some("Initial consultation".to_string()),
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    let Json(body) = result.expect("booking a free slot should succeed");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["id"], json!(created_id));
}

#[tokio::test]
async fn book_appointment_returns_conflict_on_occupied_slot() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let existing_id = Uuid::new_v4();

    mock_patient_exists(&mock_server, patient_id).await;
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(existing_id, owner_id, Uuid::new_v4(), "10:00", 60, "confirmed")]),
        json!([]),
    ).await;

    let request = BookAppointmentRequest {
        owner_id,
        patient_id,
        date: test_date(),
        time: "10:30".to_string(),
        duration_minutes: 30,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    let err = result.expect_err("overlapping slot must be rejected");
    assert_matches!(err, AppError::SchedulingConflict { ref conflicts, .. } => {
        assert_eq!(conflicts["appointments"][0]["id"], json!(existing_id));
    });
}

#[tokio::test]
async fn back_to_back_appointments_are_allowed() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let created_id = Uuid::new_v4();

    mock_patient_exists(&mock_server, patient_id).await;
    // Existing appointment 10:00-11:00; candidate starts exactly at 11:00
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(Uuid::new_v4(), owner_id, Uuid::new_v4(), "10:00", 60, "scheduled")]),
        json!([]),
    ).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_json(created_id, owner_id, patient_id, "11:00", 30, "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    let request = BookAppointmentRequest {
        owner_id,
        patient_id,
        date: test_date(),
        time: "11:00".to_string(),
        duration_minutes: 30,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert!(result.is_ok(), "touching intervals must not conflict");
}

#[tokio::test]
async fn cancelled_appointments_do_not_block_booking() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let created_id = Uuid::new_v4();

    mock_patient_exists(&mock_server, patient_id).await;
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(Uuid::new_v4(), owner_id, Uuid::new_v4(), "10:00", 60, "cancelled")]),
        json!([]),
    ).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_json(created_id, owner_id, patient_id, "10:00", 60, "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    let request = BookAppointmentRequest {
        owner_id,
        patient_id,
        date: test_date(),
        time: "10:00".to_string(),
        duration_minutes: 60,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert!(result.is_ok(), "a cancelled appointment leaves its slot free");
}

#[tokio::test]
async fn time_blocks_reject_overlapping_bookings() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let block_id = Uuid::new_v4();

    mock_patient_exists(&mock_server, patient_id).await;
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([]),
        json!([{
            "id": block_id,
            "owner_id": owner_id,
            "date": "2025-06-02",
            "start_time": "13:00",
            "end_time": "14:00",
            "reason": "Lunch",
            "block_type": "break",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }]),
    ).await;

    let request = BookAppointmentRequest {
        owner_id,
        patient_id,
        date: test_date(),
        time: "13:30".to_string(),
        duration_minutes: 30,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    let err = result.expect_err("slot inside a time block must be rejected");
    assert_matches!(err, AppError::SchedulingConflict { ref conflicts, .. } => {
        assert_eq!(conflicts["time_blocks"][0]["reason"], json!("Lunch"));
    });
}

#[tokio::test]
async fn book_appointment_rejects_malformed_time() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    let request = BookAppointmentRequest {
        owner_id,
        patient_id: Uuid::new_v4(),
        date: test_date(),
        time: "25:00".to_string(),
        duration_minutes: 30,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn patients_cannot_book_for_other_patients() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::with_store_url(&mock_server.uri());
    let config = test_config.to_arc();

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &test_config.jwt_secret, None);

    let request = BookAppointmentRequest {
        owner_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(), // someone else
        date: test_date(),
        time: "10:00".to_string(),
        duration_minutes: 30,
        reason: None,
    };

    let result = book_appointment(
        State(config),
        create_auth_header(&token),
        create_user_extension(&patient),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

// ==============================================================================
// RESCHEDULING
// ==============================================================================

#[tokio::test]
async fn reschedule_excludes_own_prior_slot() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    let current = appointment_json(appointment_id, owner_id, patient_id, "09:00", 30, "scheduled");

    // Lookup by id returns the current record
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&mock_server)
        .await;

    // The day's calendar still contains the appointment being moved
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(appointment_id, owner_id, patient_id, "09:00", 30, "scheduled")]),
        json!([]),
    ).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_json(appointment_id, owner_id, patient_id, "09:15", 30, "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    // Overlaps only the appointment's own prior slot
    let request = RescheduleAppointmentRequest {
        date: None,
        time: "09:15".to_string(),
        duration_minutes: None,
    };

    let result = reschedule_appointment(
        State(config),
        Path(appointment_id),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    let Json(body) = result.expect("moving within the own slot must not self-conflict");
    assert_eq!(body["appointment"]["time"], json!("09:15"));
}

#[tokio::test]
async fn reschedule_onto_another_appointment_is_rejected() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_json(appointment_id, owner_id, patient_id, "09:00", 30, "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([
            appointment_json(appointment_id, owner_id, patient_id, "09:00", 30, "scheduled"),
            appointment_json(other_id, owner_id, Uuid::new_v4(), "10:00", 60, "confirmed")
        ]),
        json!([]),
    ).await;

    let request = RescheduleAppointmentRequest {
        date: None,
        time: "10:30".to_string(),
        duration_minutes: None,
    };

    let result = reschedule_appointment(
        State(config),
        Path(appointment_id),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::SchedulingConflict { .. }));
}

// ==============================================================================
// CONFLICT CHECK ENDPOINT
// ==============================================================================

#[tokio::test]
async fn conflict_check_reports_colliding_records() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let existing_id = Uuid::new_v4();

    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(existing_id, owner_id, Uuid::new_v4(), "10:00", 60, "scheduled")]),
        json!([]),
    ).await;

    let params = ConflictCheckQuery {
        owner_id,
        date: test_date(),
        time: "10:30".to_string(),
        duration_minutes: 30,
        exclude_appointment_id: None,
    };

    let result = check_appointment_conflicts(
        State(config),
        Query(params),
        create_auth_header(&token),
        create_user_extension(&clinician),
    ).await;

    let Json(body) = result.expect("conflict check should succeed");
    assert_eq!(body["has_conflict"], json!(true));
    assert_eq!(body["appointments"][0]["id"], json!(existing_id));
}

#[tokio::test]
async fn conflict_check_is_clean_for_free_slot() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    mock_day_calendar(&mock_server, owner_id, json!([]), json!([])).await;

    let params = ConflictCheckQuery {
        owner_id,
        date: test_date(),
        time: "10:30".to_string(),
        duration_minutes: 30,
        exclude_appointment_id: None,
    };

    let result = check_appointment_conflicts(
        State(config),
        Query(params),
        create_auth_header(&token),
        create_user_extension(&clinician),
    ).await;

    let Json(body) = result.expect("conflict check should succeed");
    assert_eq!(body["has_conflict"], json!(false));
}

// ==============================================================================
// SLOT SUGGESTIONS
// ==============================================================================

#[tokio::test]
async fn suggested_slots_avoid_existing_commitments() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    // The whole morning from 08:00 to 09:00 is taken
    mock_day_calendar(
        &mock_server,
        owner_id,
        json!([appointment_json(Uuid::new_v4(), owner_id, Uuid::new_v4(), "08:00", 60, "scheduled")]),
        json!([]),
    ).await;

    let params = SlotSuggestionQuery {
        owner_id,
        date: test_date(),
        duration_minutes: 30,
        limit: Some(2),
    };

    let result = suggest_appointment_slots(
        State(config),
        Query(params),
        create_auth_header(&token),
        create_user_extension(&clinician),
    ).await;

    let Json(body) = result.expect("slot suggestion should succeed");
    let slots = body["suggested_slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    // First free start after the 08:00-09:00 appointment is 09:00
    assert_eq!(slots[0]["time"], json!("09:00"));
    assert_eq!(slots[1]["time"], json!("09:15"));
}
