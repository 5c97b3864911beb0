use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::aggregator::SignalWeights;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModelVersion {
    pub id: Uuid,
    pub model_name: String,
    pub version: String,
    pub is_active: bool,
    pub is_experiment: bool,
    pub experiment_config: Value,
    pub performance_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Typed view over `ModelVersion.experiment_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub weights: Option<SignalWeights>,
    /// Fraction of traffic (0.0 – 1.0) routed to an experiment version.
    #[serde(default)]
    pub traffic_share: f64,
}

impl ModelVersion {
    /// Parses the config blob; unknown or malformed configs fall back to defaults.
    pub fn config(&self) -> ExperimentConfig {
        if self.experiment_config.is_null() {
            return ExperimentConfig::default();
        }
        match serde_json::from_value::<ExperimentConfig>(self.experiment_config.clone()) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(model_version_id = %self.id, "ignoring malformed experiment config: {e}");
                ExperimentConfig::default()
            }
        }
    }
}
