//! Model Registry: versioned, A/B-tested matcher configurations.
//!
//! Invariants:
//! - at most one version per model name is `is_active && !is_experiment`
//! - no version is ever `is_active && is_experiment`
//!
//! Activation is a swap keyed by model name: callers for the same name are
//! serialized on a per-name mutex and the store clears the previous active
//! version and sets the new one in a single transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::model_version::ModelVersion;
use crate::registry::store::ModelStore;

/// Resolution of experiment traffic routing.
const ROUTING_SLOTS: u128 = 10_000;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model version {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Invalid(String),

    #[error("model '{model_name}' already has version '{version}'")]
    Duplicate { model_name: String, version: String },

    #[error("model version {0} is an experiment and cannot be activated")]
    ExperimentActivation(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModelVersion {
    pub model_name: String,
    pub version: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_experiment: bool,
    #[serde(default)]
    pub experiment_config: Value,
}

pub struct ModelRegistry {
    store: Arc<dyn ModelStore>,
    name_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            name_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Entries nobody holds or waits on (only the map's own reference left)
    /// are dropped on each call, so the map tracks in-flight names only.
    fn lock_for(&self, model_name: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.name_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.retain(|name, lock| name == model_name || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(model_name.to_string()).or_default())
    }

    pub async fn get(&self, id: Uuid) -> Result<ModelVersion, RegistryError> {
        self.store
            .get(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    pub async fn list(&self, model_name: Option<&str>) -> Result<Vec<ModelVersion>, RegistryError> {
        Ok(self.store.list(model_name).await?)
    }

    pub async fn create(&self, input: NewModelVersion) -> Result<ModelVersion, RegistryError> {
        let model_name = input.model_name.trim().to_string();
        let version = input.version.trim().to_string();
        if model_name.is_empty() || version.is_empty() {
            return Err(RegistryError::Invalid(
                "model_name and version must not be blank".to_string(),
            ));
        }
        if input.is_active && input.is_experiment {
            return Err(RegistryError::Invalid(
                "a version cannot be both active and an experiment".to_string(),
            ));
        }

        let candidate = ModelVersion {
            id: Uuid::new_v4(),
            model_name: model_name.clone(),
            version: version.clone(),
            is_active: input.is_active,
            is_experiment: input.is_experiment,
            experiment_config: input.experiment_config,
            performance_score: None,
            created_at: Utc::now(),
        };
        let share = candidate.config().traffic_share;
        if !(0.0..=1.0).contains(&share) {
            return Err(RegistryError::Invalid(
                "traffic_share must be between 0 and 1".to_string(),
            ));
        }

        let lock = self.lock_for(&model_name);
        let _guard = lock.lock().await;

        let existing = self.store.list(Some(&model_name)).await?;
        if existing.iter().any(|v| v.version == version) {
            return Err(RegistryError::Duplicate {
                model_name,
                version,
            });
        }

        match self.store.insert(&candidate).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(RegistryError::Duplicate {
                    model_name,
                    version,
                })
            }
            Err(e) => return Err(e.into()),
        }
        info!(model = %model_name, version = %version, "model version registered");
        self.get(candidate.id).await
    }

    /// Makes `id` the single active version of its model name.
    pub async fn activate(&self, id: Uuid) -> Result<ModelVersion, RegistryError> {
        let target = self.get(id).await?;
        if target.is_experiment {
            return Err(RegistryError::ExperimentActivation(id));
        }

        let lock = self.lock_for(&target.model_name);
        let _guard = lock.lock().await;

        self.store.swap_active(&target.model_name, id).await?;
        info!(model = %target.model_name, version = %target.version, "model version activated");
        self.get(id).await
    }

    /// Clears the active flag only; no other version is promoted.
    pub async fn deactivate(&self, id: Uuid) -> Result<ModelVersion, RegistryError> {
        let target = self.get(id).await?;

        let lock = self.lock_for(&target.model_name);
        let _guard = lock.lock().await;

        self.store.set_active(id, false).await?;
        info!(model = %target.model_name, version = %target.version, "model version deactivated");
        self.get(id).await
    }

    pub async fn active_version(&self, model_name: &str) -> Result<Option<ModelVersion>, RegistryError> {
        let mut active: Vec<ModelVersion> = self
            .store
            .list(Some(model_name))
            .await?
            .into_iter()
            .filter(|v| v.is_active && !v.is_experiment)
            .collect();
        if active.len() > 1 {
            warn!(model = model_name, count = active.len(), "more than one active model version");
        }
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active.into_iter().next())
    }

    /// Picks the version that should serve `routing_key`.
    ///
    /// Experiment versions with a positive `traffic_share` each own a slice of
    /// the key space (laid out in id order); keys outside every slice go to
    /// the active version. Deterministic for a given key.
    pub async fn route(
        &self,
        model_name: &str,
        routing_key: Uuid,
    ) -> Result<Option<ModelVersion>, RegistryError> {
        let mut experiments: Vec<(ModelVersion, f64)> = self
            .store
            .list(Some(model_name))
            .await?
            .into_iter()
            .filter(|v| v.is_experiment && !v.is_active)
            .map(|v| {
                let share = v.config().traffic_share;
                (v, share)
            })
            .filter(|(_, share)| *share > 0.0)
            .collect();
        experiments.sort_by_key(|(v, _)| v.id);

        let slot = (routing_key.as_u128() % ROUTING_SLOTS) as f64 / ROUTING_SLOTS as f64;
        let mut upper = 0.0;
        for (version, share) in experiments {
            upper += share;
            if slot < upper {
                return Ok(Some(version));
            }
        }
        self.active_version(model_name).await
    }

    pub async fn record_performance(&self, id: Uuid, score: f64) -> Result<(), RegistryError> {
        self.store.set_performance(id, score).await?;
        Ok(())
    }
}
