use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{Transcript, CreateTranscriptRequest, UpdateTranscriptRequest, DocumentationError};

pub struct TranscriptService {
    store: Arc<StoreClient>,
}

impl TranscriptService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(StoreClient::new(config)))
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn create_transcript(
        &self,
        request: CreateTranscriptRequest,
        auth_token: &str,
    ) -> Result<Transcript, DocumentationError> {
        debug!("Creating transcript for patient {} by clinician {}",
               request.patient_id, request.owner_id);

        if request.content.trim().is_empty() {
            return Err(DocumentationError::ValidationError("Transcript content must not be empty".to_string()));
        }

        let transcript_data = json!({
            "owner_id": request.owner_id,
            "patient_id": request.patient_id,
            "appointment_id": request.appointment_id,
            "content": request.content,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/transcripts",
            Some(auth_token),
            Some(transcript_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::DatabaseError("Failed to create transcript".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse transcript: {}", e)))
    }

    pub async fn get_transcript(
        &self,
        transcript_id: Uuid,
        auth_token: &str,
    ) -> Result<Transcript, DocumentationError> {
        let path = format!("/rest/v1/transcripts?id=eq.{}", transcript_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TranscriptNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse transcript: {}", e)))
    }

    pub async fn update_transcript(
        &self,
        transcript_id: Uuid,
        request: UpdateTranscriptRequest,
        auth_token: &str,
    ) -> Result<Transcript, DocumentationError> {
        debug!("Updating transcript: {}", transcript_id);

        let mut update_data = serde_json::Map::new();

        if let Some(content) = request.content {
            if content.trim().is_empty() {
                return Err(DocumentationError::ValidationError("Transcript content must not be empty".to_string()));
            }
            update_data.insert("content".to_string(), json!(content));
        }
        if let Some(appointment_id) = request.appointment_id {
            update_data.insert("appointment_id".to_string(), json!(appointment_id));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/transcripts?id=eq.{}", transcript_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TranscriptNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse transcript: {}", e)))
    }

    pub async fn delete_transcript(
        &self,
        transcript_id: Uuid,
        auth_token: &str,
    ) -> Result<Transcript, DocumentationError> {
        debug!("Deleting transcript: {}", transcript_id);

        let path = format!("/rest/v1/transcripts?id=eq.{}", transcript_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TranscriptNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse transcript: {}", e)))
    }

    /// Transcripts for one patient, newest first. Optionally narrowed to one
    /// clinician.
    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        owner_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Transcript>, DocumentationError> {
        let mut query_parts = vec![format!("patient_id=eq.{}", patient_id)];

        if let Some(owner_id) = owner_id {
            query_parts.push(format!("owner_id=eq.{}", owner_id));
        }

        query_parts.push("order=created_at.desc".to_string());

        let path = format!("/rest/v1/transcripts?{}", query_parts.join("&"));

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|transcript| serde_json::from_value(transcript))
            .collect::<std::result::Result<Vec<Transcript>, _>>()
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse transcripts: {}", e)))
    }
}
