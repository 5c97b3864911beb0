//! Multi-Resume Comparator: scores 2 to 5 resumes against one vacancy.
//!
//! Scoring runs as bounded concurrent tasks (a semaphore caps the fan-out) and
//! each resume has its own timeout; a failed or timed-out resume becomes an
//! error entry instead of failing the batch.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::matching::engine::{MatchEngine, MatchResult};
use crate::matching::store::ProfileStore;
use crate::models::profile::VacancyRequirement;

pub const MIN_RESUMES: usize = 2;
pub const MAX_RESUMES: usize = 5;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonRequest {
    pub vacancy_id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    pub resume_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeComparisonResult {
    pub resume_id: Uuid,
    /// 1-based; `None` for resumes that could not be scored.
    pub rank: Option<usize>,
    pub result: Option<MatchResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonMatrixData {
    pub vacancy_id: Uuid,
    pub comparisons: Vec<ResumeComparisonResult>,
    pub all_unique_skills: Vec<String>,
    pub processing_time_ms: u64,
}

/// Aggregate score descending, then matched-skill count descending, then
/// resume id ascending.
pub fn ranking_order(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.aggregate_score
        .total_cmp(&a.aggregate_score)
        .then_with(|| b.matched_count().cmp(&a.matched_count()))
        .then_with(|| a.resume_id.cmp(&b.resume_id))
}

pub struct Comparator {
    engine: Arc<MatchEngine>,
    profiles: Arc<dyn ProfileStore>,
    concurrency: usize,
    per_resume_timeout: Duration,
}

impl Comparator {
    pub fn new(
        engine: Arc<MatchEngine>,
        profiles: Arc<dyn ProfileStore>,
        concurrency: usize,
        per_resume_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            profiles,
            concurrency: concurrency.clamp(1, MAX_RESUMES),
            per_resume_timeout,
        }
    }

    fn validate(request: &ComparisonRequest) -> Result<(), CompareError> {
        let count = request.resume_ids.len();
        if !(MIN_RESUMES..=MAX_RESUMES).contains(&count) {
            return Err(CompareError::Validation(format!(
                "between {MIN_RESUMES} and {MAX_RESUMES} resumes are required, got {count}"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = request.resume_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(CompareError::Validation(format!("resume {dup} listed more than once")));
        }
        Ok(())
    }

    pub async fn compare(&self, request: ComparisonRequest) -> Result<ComparisonMatrixData, CompareError> {
        let started = Instant::now();
        Self::validate(&request)?;

        let vacancy = self.profiles.vacancy(request.vacancy_id).await?;
        vacancy.validate().map_err(CompareError::Validation)?;
        let vacancy = Arc::new(vacancy);

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = request
            .resume_ids
            .iter()
            .map(|&resume_id| {
                let task = ScoreTask {
                    engine: Arc::clone(&self.engine),
                    profiles: Arc::clone(&self.profiles),
                    vacancy: Arc::clone(&vacancy),
                    organization_id: request.organization_id,
                    resume_id,
                };
                let permits = Arc::clone(&permits);
                let limit = self.per_resume_timeout;
                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| format!("scoring cancelled: {e}"))?;
                    match tokio::time::timeout(limit, task.run()).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(format!("scoring timed out after {} ms", limit.as_millis())),
                    }
                });
                (resume_id, handle)
            })
            .collect();

        let mut scored = Vec::new();
        let mut failed = Vec::new();
        for (resume_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(format!("scoring task failed: {e}")),
            };
            match outcome {
                Ok(result) => scored.push(result),
                Err(message) => {
                    warn!(resume_id = %resume_id, vacancy_id = %request.vacancy_id, "resume excluded from comparison: {message}");
                    failed.push((resume_id, message));
                }
            }
        }

        scored.sort_by(ranking_order);
        failed.sort_by_key(|(id, _)| *id);

        let all_unique_skills: BTreeSet<String> = scored
            .iter()
            .flat_map(|r| r.referenced_skills().map(str::to_string))
            .collect();

        let mut comparisons: Vec<ResumeComparisonResult> = scored
            .into_iter()
            .enumerate()
            .map(|(i, result)| ResumeComparisonResult {
                resume_id: result.resume_id,
                rank: Some(i + 1),
                result: Some(result),
                error: None,
            })
            .collect();
        comparisons.extend(failed.into_iter().map(|(resume_id, message)| ResumeComparisonResult {
            resume_id,
            rank: None,
            result: None,
            error: Some(message),
        }));

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            vacancy_id = %request.vacancy_id,
            resumes = comparisons.len(),
            processing_time_ms,
            "comparison finished"
        );

        Ok(ComparisonMatrixData {
            vacancy_id: request.vacancy_id,
            comparisons,
            all_unique_skills: all_unique_skills.into_iter().collect(),
            processing_time_ms,
        })
    }
}

/// Everything one spawned scoring task owns.
struct ScoreTask {
    engine: Arc<MatchEngine>,
    profiles: Arc<dyn ProfileStore>,
    vacancy: Arc<VacancyRequirement>,
    organization_id: Option<Uuid>,
    resume_id: Uuid,
}

impl ScoreTask {
    async fn run(self) -> Result<MatchResult, String> {
        let profile = self
            .profiles
            .resume_profile(self.resume_id)
            .await
            .map_err(|e| e.to_string())?;
        self.engine
            .evaluate(&profile, &self.vacancy, self.organization_id)
            .await
            .map_err(|e| e.to_string())
    }
}
