use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A reusable clinical-note skeleton owned by one clinician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTemplate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteTemplateRequest {
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNoteTemplateRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A consultation transcript stored as plain text. Audio capture and
/// speech-to-text happen upstream; only the resulting text lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTranscriptRequest {
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTranscriptRequest {
    pub content: Option<String>,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DocumentationError {
    #[error("Note template not found")]
    TemplateNotFound,

    #[error("Transcript not found")]
    TranscriptNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
