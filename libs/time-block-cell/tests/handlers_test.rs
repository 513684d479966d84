use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
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

use time_block_cell::handlers::*;
use time_block_cell::models::*;
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

fn time_block_json(id: Uuid, owner_id: Uuid, start_time: &str, end_time: &str, reason: &str) -> Value {
    json!({
        "id": id,
        "owner_id": owner_id,
        "date": "2025-06-02",
        "start_time": start_time,
        "end_time": end_time,
        "reason": reason,
        "block_type": "break",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn create_time_block_succeeds() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();
    let block_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/time_blocks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            time_block_json(block_id, owner_id, "13:00", "14:00", "Lunch")
        ])))
        .mount(&mock_server)
        .await;

    let request = CreateTimeBlockRequest {
        owner_id,
        date: test_date(),
        start_time: "13:00".to_string(),
        end_time: "14:00".to_string(),
        reason: "Lunch".to_string(),
        block_type: BlockType::Break,
    };

    let result = create_time_block(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    let Json(body) = result.expect("creating a valid time block should succeed");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["time_block"]["id"], json!(block_id));
}

#[tokio::test]
async fn create_time_block_rejects_inverted_span() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    let request = CreateTimeBlockRequest {
        owner_id,
        date: test_date(),
        start_time: "14:00".to_string(),
        end_time: "13:00".to_string(),
        reason: "Backwards".to_string(),
        block_type: BlockType::Meeting,
    };

    let result = create_time_block(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn create_time_block_rejects_malformed_times() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    let request = CreateTimeBlockRequest {
        owner_id,
        date: test_date(),
        start_time: "1pm".to_string(),
        end_time: "14:00".to_string(),
        reason: "Bad clock string".to_string(),
        block_type: BlockType::Other,
    };

    let result = create_time_block(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn clinicians_cannot_block_other_calendars() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let request = CreateTimeBlockRequest {
        owner_id: Uuid::new_v4(), // someone else's calendar
        date: test_date(),
        start_time: "13:00".to_string(),
        end_time: "14:00".to_string(),
        reason: "Lunch".to_string(),
        block_type: BlockType::Break,
    };

    let result = create_time_block(
        State(config),
        create_auth_header(&token),
        create_user_extension(&clinician),
        Json(request),
    ).await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn list_time_blocks_returns_day_blocks() {
    let mock_server = MockServer::start().await;
    let (config, clinician, token) = test_setup(&mock_server);

    let owner_id = Uuid::parse_str(&clinician.id).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_blocks"))
        .and(query_param("owner_id", format!("eq.{}", owner_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            time_block_json(Uuid::new_v4(), owner_id, "09:00", "09:30", "Team huddle"),
            time_block_json(Uuid::new_v4(), owner_id, "13:00", "14:00", "Lunch")
        ])))
        .mount(&mock_server)
        .await;

    let params = TimeBlockListQuery {
        owner_id,
        date: test_date(),
    };

    let result = list_time_blocks(
        State(config),
        Query(params),
        create_auth_header(&token),
        create_user_extension(&clinician),
    ).await;

    let Json(body) = result.expect("listing time blocks should succeed");
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["time_blocks"][1]["reason"], json!("Lunch"));
}
