use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{NoteTemplate, CreateNoteTemplateRequest, UpdateNoteTemplateRequest, DocumentationError};

pub struct NoteTemplateService {
    store: Arc<StoreClient>,
}

impl NoteTemplateService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(StoreClient::new(config)))
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn create_template(
        &self,
        request: CreateNoteTemplateRequest,
        auth_token: &str,
    ) -> Result<NoteTemplate, DocumentationError> {
        debug!("Creating note template '{}' for clinician {}", request.title, request.owner_id);

        if request.title.trim().is_empty() {
            return Err(DocumentationError::ValidationError("Template title must not be empty".to_string()));
        }

        let template_data = json!({
            "owner_id": request.owner_id,
            "title": request.title,
            "body": request.body,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/note_templates",
            Some(auth_token),
            Some(template_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::DatabaseError("Failed to create note template".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse note template: {}", e)))
    }

    pub async fn get_template(
        &self,
        template_id: Uuid,
        auth_token: &str,
    ) -> Result<NoteTemplate, DocumentationError> {
        let path = format!("/rest/v1/note_templates?id=eq.{}", template_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TemplateNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse note template: {}", e)))
    }

    pub async fn update_template(
        &self,
        template_id: Uuid,
        request: UpdateNoteTemplateRequest,
        auth_token: &str,
    ) -> Result<NoteTemplate, DocumentationError> {
        debug!("Updating note template: {}", template_id);

        let mut update_data = serde_json::Map::new();

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(DocumentationError::ValidationError("Template title must not be empty".to_string()));
            }
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(body) = request.body {
            update_data.insert("body".to_string(), json!(body));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/note_templates?id=eq.{}", template_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TemplateNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse note template: {}", e)))
    }

    pub async fn delete_template(
        &self,
        template_id: Uuid,
        auth_token: &str,
    ) -> Result<NoteTemplate, DocumentationError> {
        debug!("Deleting note template: {}", template_id);

        let path = format!("/rest/v1/note_templates?id=eq.{}", template_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DocumentationError::TemplateNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse note template: {}", e)))
    }

    pub async fn list_templates(
        &self,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<NoteTemplate>, DocumentationError> {
        let path = format!(
            "/rest/v1/note_templates?owner_id=eq.{}&order=title.asc",
            owner_id
        );

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DocumentationError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|template| serde_json::from_value(template))
            .collect::<std::result::Result<Vec<NoteTemplate>, _>>()
            .map_err(|e| DocumentationError::DatabaseError(format!("Failed to parse note templates: {}", e)))
    }
}
