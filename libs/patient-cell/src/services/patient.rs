use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{Patient, CreatePatientRequest, UpdatePatientRequest, PatientError};

pub struct PatientService {
    store: Arc<StoreClient>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(StoreClient::new(config)))
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating new patient record for: {}", request.email);

        // Check if patient with email already exists
        let existing_check_path = format!(
            "/rest/v1/patients?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<Value> = self.store.request(
            Method::GET,
            &existing_check_path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(PatientError::AlreadyExists(request.email));
        }

        let patient_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone_number": request.phone_number,
            "date_of_birth": request.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::DatabaseError("Failed to create patient record".to_string()));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))?;

        debug!("Patient record created successfully with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient record: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(date_of_birth.format("%Y-%m-%d").to_string()));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn delete_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Deleting patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.store.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(StoreClient::representation_headers()),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    /// Case-insensitive name/email search, newest first.
    pub async fn search_patients(
        &self,
        term: &str,
        limit: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients for term: {}", term);

        let pattern = urlencoding::encode(term).into_owned();
        let path = format!(
            "/rest/v1/patients?or=(first_name.ilike.*{}*,last_name.ilike.*{}*,email.ilike.*{}*)&order=created_at.desc&limit={}",
            pattern, pattern, pattern,
            limit.unwrap_or(50)
        );

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(|patient| serde_json::from_value(patient))
            .collect::<std::result::Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))
    }
}
