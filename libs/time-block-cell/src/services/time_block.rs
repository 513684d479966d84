use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_utils::clock::parse_clock_time;

use crate::models::{TimeBlock, CreateTimeBlockRequest, UpdateTimeBlockRequest, TimeBlockError};

pub struct TimeBlockService {
    store: Arc<StoreClient>,
}

impl TimeBlockService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(StoreClient::new(config)))
    }

    /// Inject an existing store client (shared across services, mocked in tests).
    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn create_time_block(
        &self,
        request: CreateTimeBlockRequest,
        auth_token: &str,
    ) -> Result<TimeBlock, TimeBlockError> {
        debug!("Creating time block for clinician {} on {}", request.owner_id, request.date);

        Self::validate_span(&request.start_time, &request.end_time)?;

        let block_data = json!({
            "owner_id": request.owner_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "start_time": request.start_time,
            "end_time": request.end_time,
            "reason": request.reason,
            "block_type": request.block_type,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/time_blocks",
            Some(auth_token),
            Some(block_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| TimeBlockError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TimeBlockError::DatabaseError("Failed to create time block".to_string()));
        }

        let block: TimeBlock = serde_json::from_value(result[0].clone())
            .map_err(|e| TimeBlockError::DatabaseError(format!("Failed to parse time block: {}", e)))?;

        debug!("Time block created with ID: {}", block.id);
        Ok(block)
    }

    pub async fn get_time_block(
        &self,
        block_id: Uuid,
        auth_token: &str,
    ) -> Result<TimeBlock, TimeBlockError> {
        let path = format!("/rest/v1/time_blocks?id=eq.{}", block_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TimeBlockError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TimeBlockError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| TimeBlockError::DatabaseError(format!("Failed to parse time block: {}", e)))
    }

    pub async fn update_time_block(
        &self,
        block_id: Uuid,
        request: UpdateTimeBlockRequest,
        auth_token: &str,
    ) -> Result<TimeBlock, TimeBlockError> {
        debug!("Updating time block: {}", block_id);

        let current = self.get_time_block(block_id, auth_token).await?;

        // Validate the merged span whenever either end moves
        if request.start_time.is_some() || request.end_time.is_some() {
            let start = request.start_time.as_deref().unwrap_or(&current.start_time);
            let end = request.end_time.as_deref().unwrap_or(&current.end_time);
            Self::validate_span(start, end)?;
        }

        let mut update_data = serde_json::Map::new();

        if let Some(date) = request.date {
            update_data.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(start_time) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start_time));
        }
        if let Some(end_time) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end_time));
        }
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(block_type) = request.block_type {
            update_data.insert("block_type".to_string(), json!(block_type));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/time_blocks?id=eq.{}", block_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| TimeBlockError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TimeBlockError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| TimeBlockError::DatabaseError(format!("Failed to parse time block: {}", e)))
    }

    pub async fn delete_time_block(
        &self,
        block_id: Uuid,
        auth_token: &str,
    ) -> Result<TimeBlock, TimeBlockError> {
        debug!("Deleting time block: {}", block_id);

        let path = format!("/rest/v1/time_blocks?id=eq.{}", block_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| TimeBlockError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TimeBlockError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| TimeBlockError::DatabaseError(format!("Failed to parse time block: {}", e)))
    }

    /// All of one clinician's blocks for one calendar date, ordered by start.
    pub async fn list_for_day(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeBlock>, TimeBlockError> {
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
        ).await.map_err(|e| TimeBlockError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|block| serde_json::from_value(block))
            .collect::<std::result::Result<Vec<TimeBlock>, _>>()
            .map_err(|e| TimeBlockError::DatabaseError(format!("Failed to parse time blocks: {}", e)))
    }

    fn validate_span(start_time: &str, end_time: &str) -> Result<(), TimeBlockError> {
        let start = parse_clock_time(start_time)
            .map_err(TimeBlockError::ValidationError)?;
        let end = parse_clock_time(end_time)
            .map_err(TimeBlockError::ValidationError)?;

        if start >= end {
            return Err(TimeBlockError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }

        Ok(())
    }
}
