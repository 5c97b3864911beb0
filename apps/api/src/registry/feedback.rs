//! Recruiter feedback on individual skill verdicts, and the accuracy figures
//! derived from it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::feedback::FeedbackEntry;
use crate::registry::model_registry::{ModelRegistry, RegistryError};
use crate::registry::store::{FeedbackCounts, FeedbackStore};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub resume_id: Uuid,
    pub vacancy_id: Uuid,
    pub skill: String,
    pub was_correct: bool,
    pub confidence_score: f64,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub model_version_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccuracyReport {
    pub model_version_id: Option<Uuid>,
    pub processed_correct: u64,
    pub processed_total: u64,
    /// `None` until at least one entry has been processed.
    pub accuracy: Option<f64>,
}

impl AccuracyReport {
    fn from_counts(model_version_id: Option<Uuid>, counts: FeedbackCounts) -> Self {
        let accuracy = if counts.total == 0 {
            None
        } else {
            Some(counts.correct as f64 / counts.total as f64)
        };
        Self {
            model_version_id,
            processed_correct: counts.correct,
            processed_total: counts.total,
            accuracy,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProcessSummary {
    pub processed: usize,
    pub versions_updated: usize,
}

pub struct FeedbackLog {
    store: Arc<dyn FeedbackStore>,
    registry: Arc<ModelRegistry>,
}

impl FeedbackLog {
    pub fn new(store: Arc<dyn FeedbackStore>, registry: Arc<ModelRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn record(&self, input: NewFeedback) -> Result<FeedbackEntry, FeedbackError> {
        let skill = input.skill.trim();
        if skill.is_empty() {
            return Err(FeedbackError::Invalid("skill must not be blank".to_string()));
        }
        if !input.confidence_score.is_finite() || !(0.0..=1.0).contains(&input.confidence_score) {
            return Err(FeedbackError::Invalid(
                "confidence_score must be between 0 and 1".to_string(),
            ));
        }
        if let Some(version_id) = input.model_version_id {
            match self.registry.get(version_id).await {
                Ok(_) => {}
                Err(RegistryError::NotFound(id)) => {
                    return Err(FeedbackError::Invalid(format!("unknown model version {id}")));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let entry = FeedbackEntry {
            id: Uuid::new_v4(),
            resume_id: input.resume_id,
            vacancy_id: input.vacancy_id,
            skill: skill.to_string(),
            was_correct: input.was_correct,
            confidence_score: input.confidence_score,
            correction: input
                .correction
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            model_version_id: input.model_version_id,
            processed: false,
            created_at: Utc::now(),
        };
        self.store.insert(&entry).await?;
        info!(resume_id = %entry.resume_id, skill = %entry.skill, was_correct = entry.was_correct, "feedback recorded");
        Ok(entry)
    }

    /// Accuracy over processed feedback; `None` covers every version.
    pub async fn accuracy(&self, model_version_id: Option<Uuid>) -> Result<AccuracyReport, FeedbackError> {
        let counts = self.store.processed_counts(model_version_id).await?;
        Ok(AccuracyReport::from_counts(model_version_id, counts))
    }

    /// Marks pending feedback processed and refreshes the performance score
    /// of every model version it touched.
    pub async fn process_pending(&self) -> Result<ProcessSummary, FeedbackError> {
        let pending = self.store.unprocessed().await?;
        if pending.is_empty() {
            return Ok(ProcessSummary::default());
        }

        let ids: Vec<Uuid> = pending.iter().map(|e| e.id).collect();
        let touched: BTreeSet<Uuid> = pending.iter().filter_map(|e| e.model_version_id).collect();
        self.store.mark_processed(&ids).await?;

        let mut versions_updated = 0;
        for version_id in touched {
            let report = self.accuracy(Some(version_id)).await?;
            let Some(accuracy) = report.accuracy else {
                continue;
            };
            match self.registry.record_performance(version_id, accuracy).await {
                Ok(()) => versions_updated += 1,
                Err(e) => warn!(model_version_id = %version_id, "failed to record performance: {e}"),
            }
        }

        info!(processed = ids.len(), versions_updated, "feedback processed");
        Ok(ProcessSummary {
            processed: ids.len(),
            versions_updated,
        })
    }
}
