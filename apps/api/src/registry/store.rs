use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::feedback::FeedbackEntry;
use crate::models::model_version::ModelVersion;

#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn list(&self, model_name: Option<&str>) -> Result<Vec<ModelVersion>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<ModelVersion>, StoreError>;
    /// Inserts a new version. When `version.is_active` is set, every other
    /// active version of the same model name is cleared in the same step.
    /// A taken `(model_name, version)` pair is a `StoreError::Conflict`.
    async fn insert(&self, version: &ModelVersion) -> Result<(), StoreError>;
    /// Clears every other active version of `model_name` and activates `id`,
    /// as one atomic step.
    async fn swap_active(&self, model_name: &str, id: Uuid) -> Result<(), StoreError>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), StoreError>;
    async fn set_performance(&self, id: Uuid, score: f64) -> Result<(), StoreError>;
}

/// Correct / total counts over processed feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub correct: u64,
    pub total: u64,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert(&self, entry: &FeedbackEntry) -> Result<(), StoreError>;
    async fn unprocessed(&self) -> Result<Vec<FeedbackEntry>, StoreError>;
    async fn mark_processed(&self, ids: &[Uuid]) -> Result<(), StoreError>;
    /// `None` counts every processed entry.
    async fn processed_counts(&self, model_version_id: Option<Uuid>) -> Result<FeedbackCounts, StoreError>;
}

pub struct PgModelStore {
    pool: PgPool,
}

impl PgModelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MODEL_COLUMNS: &str = "id, model_name, version, is_active, is_experiment, \
                             experiment_config, performance_score, created_at";

const NAME_VERSION_CONSTRAINT: &str = "model_versions_name_version_key";

fn version_conflict(err: sqlx::Error, version: &ModelVersion) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.constraint() == Some(NAME_VERSION_CONSTRAINT) => {
            StoreError::Conflict(format!(
                "Model '{}' version '{}'",
                version.model_name, version.version
            ))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ModelStore for PgModelStore {
    async fn list(&self, model_name: Option<&str>) -> Result<Vec<ModelVersion>, StoreError> {
        let versions = sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_COLUMNS} FROM model_versions \
             WHERE ($1::text IS NULL OR model_name = $1) \
             ORDER BY model_name, created_at"
        ))
        .bind(model_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(versions)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ModelVersion>, StoreError> {
        let version = sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_COLUMNS} FROM model_versions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(version)
    }

    async fn insert(&self, version: &ModelVersion) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if version.is_active {
            sqlx::query("SELECT id FROM model_versions WHERE model_name = $1 FOR UPDATE")
                .bind(&version.model_name)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE model_versions SET is_active = false WHERE model_name = $1 AND is_active")
                .bind(&version.model_name)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO model_versions
                (id, model_name, version, is_active, is_experiment, experiment_config, performance_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(version.id)
        .bind(&version.model_name)
        .bind(&version.version)
        .bind(version.is_active)
        .bind(version.is_experiment)
        .bind(&version.experiment_config)
        .bind(version.performance_score)
        .bind(version.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| version_conflict(e, version))?;

        tx.commit().await?;
        Ok(())
    }

    async fn swap_active(&self, model_name: &str, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row locks serialize activations coming from other processes.
        sqlx::query("SELECT id FROM model_versions WHERE model_name = $1 FOR UPDATE")
            .bind(model_name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE model_versions SET is_active = false \
             WHERE model_name = $1 AND is_active AND id <> $2",
        )
        .bind(model_name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE model_versions SET is_active = true \
             WHERE id = $1 AND model_name = $2 AND NOT is_experiment",
        )
        .bind(id)
        .bind(model_name)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("Model version {id}")));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE model_versions SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Model version {id}")));
        }
        Ok(())
    }

    async fn set_performance(&self, id: Uuid, score: f64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE model_versions SET performance_score = $2 WHERE id = $1")
            .bind(id)
            .bind(score)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Model version {id}")));
        }
        Ok(())
    }
}

pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn insert(&self, entry: &FeedbackEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feedback_entries
                (id, resume_id, vacancy_id, skill, was_correct, confidence_score,
                 correction, model_version_id, processed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.resume_id)
        .bind(entry.vacancy_id)
        .bind(&entry.skill)
        .bind(entry.was_correct)
        .bind(entry.confidence_score)
        .bind(&entry.correction)
        .bind(entry.model_version_id)
        .bind(entry.processed)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unprocessed(&self) -> Result<Vec<FeedbackEntry>, StoreError> {
        let entries = sqlx::query_as::<_, FeedbackEntry>(
            r#"
            SELECT id, resume_id, vacancy_id, skill, was_correct, confidence_score,
                   correction, model_version_id, processed, created_at
            FROM feedback_entries
            WHERE NOT processed
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn mark_processed(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE feedback_entries SET processed = true WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn processed_counts(&self, model_version_id: Option<Uuid>) -> Result<FeedbackCounts, StoreError> {
        let (correct, total): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE was_correct), COUNT(*)
            FROM feedback_entries
            WHERE processed AND ($1::uuid IS NULL OR model_version_id = $1)
            "#,
        )
        .bind(model_version_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(FeedbackCounts {
            correct: correct.max(0) as u64,
            total: total.max(0) as u64,
        })
    }
}
