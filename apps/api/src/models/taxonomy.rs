use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Global skill taxonomy row, shared across organizations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillTaxonomyEntry {
    pub id: Uuid,
    pub industry: String,
    pub skill: String,
    pub variants: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Organization-scoped synonym list. Wins over the taxonomy for that organization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomSynonymEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub canonical_skill: String,
    pub custom_synonyms: Vec<String>,
    pub context: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
