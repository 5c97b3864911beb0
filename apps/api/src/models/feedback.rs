use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recruiter's verdict on one skill of one match result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub vacancy_id: Uuid,
    pub skill: String,
    pub was_correct: bool,
    pub confidence_score: f64,
    pub correction: Option<String>,
    pub model_version_id: Option<Uuid>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}
