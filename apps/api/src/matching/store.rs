use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::profile::{ResumeProfile, VacancyRequirement, WorkHistoryEntry};

/// Read access to extracted resume profiles and vacancies.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn resume_profile(&self, resume_id: Uuid) -> Result<ResumeProfile, StoreError>;
    async fn vacancy(&self, vacancy_id: Uuid) -> Result<VacancyRequirement, StoreError>;
    /// Skill lists of all historical vacancies, used to weight TF-IDF terms.
    async fn vacancy_corpus(&self) -> Result<Vec<Vec<String>>, StoreError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ResumeProfileRow {
    resume_id: Uuid,
    skills: Vec<String>,
    work_history: Json<Vec<WorkHistoryEntry>>,
}

#[derive(FromRow)]
struct VacancyRow {
    id: Uuid,
    industry: Option<String>,
    mandatory_skills: Vec<String>,
    additional_skills: Vec<String>,
    required_experience: Json<BTreeMap<String, u32>>,
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn resume_profile(&self, resume_id: Uuid) -> Result<ResumeProfile, StoreError> {
        let row = sqlx::query_as::<_, ResumeProfileRow>(
            "SELECT resume_id, skills, work_history FROM resume_profiles WHERE resume_id = $1",
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Resume {resume_id}")))?;

        Ok(ResumeProfile {
            resume_id: row.resume_id,
            skills: row.skills,
            work_history: row.work_history.0,
        })
    }

    async fn vacancy(&self, vacancy_id: Uuid) -> Result<VacancyRequirement, StoreError> {
        let row = sqlx::query_as::<_, VacancyRow>(
            r#"
            SELECT id, industry, mandatory_skills, additional_skills, required_experience
            FROM vacancies
            WHERE id = $1
            "#,
        )
        .bind(vacancy_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Vacancy {vacancy_id}")))?;

        Ok(VacancyRequirement {
            vacancy_id: Some(row.id),
            industry: row.industry,
            mandatory_skills: row.mandatory_skills,
            additional_skills: row.additional_skills,
            required_experience: row.required_experience.0,
        })
    }

    async fn vacancy_corpus(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let rows: Vec<(Vec<String>,)> = sqlx::query_as(
            "SELECT mandatory_skills || additional_skills FROM vacancies",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(skills,)| skills).collect())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryProfileStore {
        pub resumes: Mutex<HashMap<Uuid, ResumeProfile>>,
        pub vacancies: Mutex<HashMap<Uuid, VacancyRequirement>>,
    }

    impl InMemoryProfileStore {
        pub fn add_resume(&self, profile: ResumeProfile) {
            self.resumes.lock().unwrap().insert(profile.resume_id, profile);
        }

        pub fn add_vacancy(&self, id: Uuid, mut vacancy: VacancyRequirement) {
            vacancy.vacancy_id = Some(id);
            self.vacancies.lock().unwrap().insert(id, vacancy);
        }
    }

    #[async_trait]
    impl ProfileStore for InMemoryProfileStore {
        async fn resume_profile(&self, resume_id: Uuid) -> Result<ResumeProfile, StoreError> {
            self.resumes
                .lock()
                .unwrap()
                .get(&resume_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("Resume {resume_id}")))
        }

        async fn vacancy(&self, vacancy_id: Uuid) -> Result<VacancyRequirement, StoreError> {
            self.vacancies
                .lock()
                .unwrap()
                .get(&vacancy_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("Vacancy {vacancy_id}")))
        }

        async fn vacancy_corpus(&self) -> Result<Vec<Vec<String>>, StoreError> {
            Ok(self
                .vacancies
                .lock()
                .unwrap()
                .values()
                .map(|v| {
                    v.mandatory_skills
                        .iter()
                        .chain(v.additional_skills.iter())
                        .cloned()
                        .collect()
                })
                .collect())
        }
    }
}
