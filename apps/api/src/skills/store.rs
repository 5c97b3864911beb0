use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::StoreError;
use crate::models::taxonomy::{CustomSynonymEntry, SkillTaxonomyEntry};

/// Persistence for the taxonomy and org synonym lists.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn load_taxonomy(&self) -> Result<Vec<SkillTaxonomyEntry>, StoreError>;
    async fn load_synonyms(&self) -> Result<Vec<CustomSynonymEntry>, StoreError>;
    async fn insert_taxonomy(&self, entry: &SkillTaxonomyEntry) -> Result<(), StoreError>;
    async fn insert_synonym(&self, entry: &CustomSynonymEntry) -> Result<(), StoreError>;
}

pub struct PgTaxonomyStore {
    pool: PgPool,
}

impl PgTaxonomyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomyStore for PgTaxonomyStore {
    async fn load_taxonomy(&self) -> Result<Vec<SkillTaxonomyEntry>, StoreError> {
        Ok(sqlx::query_as::<_, SkillTaxonomyEntry>(
            "SELECT id, industry, skill, variants, is_active, created_at FROM skill_taxonomy",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn load_synonyms(&self) -> Result<Vec<CustomSynonymEntry>, StoreError> {
        Ok(sqlx::query_as::<_, CustomSynonymEntry>(
            r#"
            SELECT id, organization_id, canonical_skill, custom_synonyms, context, is_active, created_at
            FROM custom_synonyms
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_taxonomy(&self, entry: &SkillTaxonomyEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO skill_taxonomy (id, industry, skill, variants, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.industry)
        .bind(&entry.skill)
        .bind(&entry.variants)
        .bind(entry.is_active)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_synonym(&self, entry: &CustomSynonymEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO custom_synonyms
                (id, organization_id, canonical_skill, custom_synonyms, context, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.organization_id)
        .bind(&entry.canonical_skill)
        .bind(&entry.custom_synonyms)
        .bind(&entry.context)
        .bind(entry.is_active)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
