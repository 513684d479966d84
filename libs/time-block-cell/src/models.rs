use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

use shared_utils::clock::parse_clock_time;

/// A clinician-defined span of unavailability (break, meeting, etc.).
/// Time blocks always participate in conflict checks; there is no status
/// field to exclude on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
    pub block_type: BlockType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeBlock {
    /// Minute-offset span `[start, end)` for overlap checks.
    ///
    /// Returns None when the stored clock strings are unusable; writes
    /// validate them, so a None here means a corrupt row that cannot be
    /// compared against anyway.
    pub fn interval_minutes(&self) -> Option<(i32, i32)> {
        let start = parse_clock_time(&self.start_time).ok()?;
        let end = parse_clock_time(&self.end_time).ok()?;
        (start < end).then_some((start, end))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Break,
    Meeting,
    Admin,
    OutOfOffice,
    Other,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Break => write!(f, "break"),
            BlockType::Meeting => write!(f, "meeting"),
            BlockType::Admin => write!(f, "admin"),
            BlockType::OutOfOffice => write!(f, "out_of_office"),
            BlockType::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimeBlockRequest {
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
    pub block_type: BlockType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTimeBlockRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub block_type: Option<BlockType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum TimeBlockError {
    #[error("Time block not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
