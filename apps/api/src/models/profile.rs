use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One employment interval, tagged with the skills used there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkHistoryEntry {
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    /// `None` means the role is current.
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Candidate profile as supplied by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub resume_id: Uuid,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_history: Vec<WorkHistoryEntry>,
}

/// Requirements of one vacancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VacancyRequirement {
    #[serde(default)]
    pub vacancy_id: Option<Uuid>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub mandatory_skills: Vec<String>,
    #[serde(default)]
    pub additional_skills: Vec<String>,
    /// Required months of experience, keyed by raw skill name.
    #[serde(default)]
    pub required_experience: BTreeMap<String, u32>,
}

impl VacancyRequirement {
    /// Rejects requirement data that cannot be scored.
    pub fn validate(&self) -> Result<(), String> {
        let blank_skill = self
            .mandatory_skills
            .iter()
            .chain(self.additional_skills.iter())
            .chain(self.required_experience.keys())
            .any(|s| s.trim().is_empty());
        if blank_skill {
            return Err("vacancy skills must not be blank".to_string());
        }
        Ok(())
    }
}
