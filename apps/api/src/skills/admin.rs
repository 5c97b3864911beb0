//! Admin writes for synonyms and taxonomy.
//!
//! Every write is validated against the current snapshot, persisted, and only
//! then published as a fresh snapshot. A rejected write leaves both the store
//! and the published snapshot untouched.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::taxonomy::{CustomSynonymEntry, SkillTaxonomyEntry};
use crate::skills::normalize::lookup_key;
use crate::skills::snapshot::{SnapshotHandle, SynonymSnapshot};
use crate::skills::store::TaxonomyStore;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{0} must contain at least one entry")]
    EmptyList(&'static str),

    #[error("{0} must not be blank")]
    BlankName(&'static str),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("'{literal}' is already mapped to '{existing}', cannot map it to '{requested}'")]
    ConflictingMapping {
        literal: String,
        existing: String,
        requested: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomSynonym {
    pub organization_id: Uuid,
    pub canonical_skill: String,
    pub custom_synonyms: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTaxonomyEntry {
    pub industry: String,
    pub skill: String,
    pub variants: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Builds a snapshot from whatever the store currently holds.
pub async fn load_snapshot(store: &dyn TaxonomyStore) -> Result<SynonymSnapshot, StoreError> {
    let taxonomy = store.load_taxonomy().await?;
    let synonyms = store.load_synonyms().await?;
    info!(
        taxonomy = taxonomy.len(),
        synonyms = synonyms.len(),
        "loaded skill synonym snapshot"
    );
    Ok(SynonymSnapshot::build(taxonomy, synonyms))
}

pub struct SkillAdmin {
    snapshots: Arc<SnapshotHandle>,
    store: Arc<dyn TaxonomyStore>,
}

impl SkillAdmin {
    pub fn new(snapshots: Arc<SnapshotHandle>, store: Arc<dyn TaxonomyStore>) -> Self {
        Self { snapshots, store }
    }

    /// Re-reads the store and publishes the result.
    pub async fn reload(&self) -> Result<(), SnapshotError> {
        let _guard = self.snapshots.begin_write().await;
        let snapshot = load_snapshot(self.store.as_ref()).await?;
        self.snapshots.swap(snapshot);
        Ok(())
    }

    pub async fn add_custom_synonym(
        &self,
        input: NewCustomSynonym,
    ) -> Result<CustomSynonymEntry, SnapshotError> {
        let _guard = self.snapshots.begin_write().await;
        let current = self.snapshots.load();

        let entry = CustomSynonymEntry {
            id: Uuid::new_v4(),
            organization_id: input.organization_id,
            canonical_skill: input.canonical_skill.trim().to_string(),
            custom_synonyms: trimmed(&input.custom_synonyms),
            context: input.context.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            is_active: input.is_active,
            created_at: Utc::now(),
        };
        validate_synonym(&current, &entry)?;

        self.store.insert_synonym(&entry).await?;

        let mut synonyms = current.synonyms().to_vec();
        synonyms.push(entry.clone());
        self.snapshots
            .swap(SynonymSnapshot::build(current.taxonomy().to_vec(), synonyms));

        info!(
            organization_id = %entry.organization_id,
            canonical = %entry.canonical_skill,
            "custom synonym added"
        );
        Ok(entry)
    }

    pub async fn add_taxonomy_entry(
        &self,
        input: NewTaxonomyEntry,
    ) -> Result<SkillTaxonomyEntry, SnapshotError> {
        let _guard = self.snapshots.begin_write().await;
        let current = self.snapshots.load();

        let entry = SkillTaxonomyEntry {
            id: Uuid::new_v4(),
            industry: input.industry.trim().to_string(),
            skill: input.skill.trim().to_string(),
            variants: trimmed(&input.variants),
            is_active: input.is_active,
            created_at: Utc::now(),
        };
        validate_taxonomy(&current, &entry)?;

        self.store.insert_taxonomy(&entry).await?;

        let mut taxonomy = current.taxonomy().to_vec();
        taxonomy.push(entry.clone());
        self.snapshots
            .swap(SynonymSnapshot::build(taxonomy, current.synonyms().to_vec()));

        info!(industry = %entry.industry, skill = %entry.skill, "taxonomy entry added");
        Ok(entry)
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_string()).collect()
}

fn validate_synonym(
    snapshot: &SynonymSnapshot,
    entry: &CustomSynonymEntry,
) -> Result<(), SnapshotError> {
    if entry.canonical_skill.is_empty() {
        return Err(SnapshotError::BlankName("canonical_skill"));
    }
    if entry.custom_synonyms.is_empty() {
        return Err(SnapshotError::EmptyList("custom_synonyms"));
    }
    if entry.custom_synonyms.iter().any(String::is_empty) {
        return Err(SnapshotError::BlankName("custom_synonyms"));
    }

    let canonical_key = lookup_key(&entry.canonical_skill);
    let duplicate = snapshot.synonyms().iter().any(|existing| {
        existing.is_active
            && existing.organization_id == entry.organization_id
            && lookup_key(&existing.canonical_skill) == canonical_key
            && existing.context == entry.context
    });
    if duplicate {
        return Err(SnapshotError::DuplicateEntry(format!(
            "organization {} already defines '{}'",
            entry.organization_id, entry.canonical_skill
        )));
    }

    for literal in std::iter::once(&entry.canonical_skill).chain(entry.custom_synonyms.iter()) {
        if let Some(existing) = snapshot.org_mapping(entry.organization_id, &lookup_key(literal)) {
            if lookup_key(existing) != canonical_key {
                return Err(SnapshotError::ConflictingMapping {
                    literal: literal.clone(),
                    existing: existing.to_string(),
                    requested: entry.canonical_skill.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_taxonomy(
    snapshot: &SynonymSnapshot,
    entry: &SkillTaxonomyEntry,
) -> Result<(), SnapshotError> {
    if entry.industry.is_empty() {
        return Err(SnapshotError::BlankName("industry"));
    }
    if entry.skill.is_empty() {
        return Err(SnapshotError::BlankName("skill"));
    }
    if entry.variants.is_empty() {
        return Err(SnapshotError::EmptyList("variants"));
    }
    if entry.variants.iter().any(String::is_empty) {
        return Err(SnapshotError::BlankName("variants"));
    }

    let industry_key = lookup_key(&entry.industry);
    let skill_key = lookup_key(&entry.skill);
    let duplicate = snapshot.taxonomy().iter().any(|existing| {
        existing.is_active
            && lookup_key(&existing.industry) == industry_key
            && lookup_key(&existing.skill) == skill_key
    });
    if duplicate {
        return Err(SnapshotError::DuplicateEntry(format!(
            "industry '{}' already defines '{}'",
            entry.industry, entry.skill
        )));
    }

    for literal in entry.variants.iter() {
        if let Some(existing) = snapshot.industry_mapping(&entry.industry, &lookup_key(literal)) {
            if lookup_key(existing) != skill_key {
                return Err(SnapshotError::ConflictingMapping {
                    literal: literal.clone(),
                    existing: existing.to_string(),
                    requested: entry.skill.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::canonicalizer::SkillCanonicalizer;
    use crate::skills::snapshot::fixtures::{synonym, taxonomy};
    use crate::skills::store::memory::InMemoryTaxonomyStore;

    fn admin_with(store: Arc<InMemoryTaxonomyStore>, snapshot: SynonymSnapshot) -> SkillAdmin {
        SkillAdmin::new(Arc::new(SnapshotHandle::new(snapshot)), store)
    }

    fn new_synonym(org: Uuid, canonical: &str, synonyms: &[&str]) -> NewCustomSynonym {
        NewCustomSynonym {
            organization_id: org,
            canonical_skill: canonical.to_string(),
            custom_synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            context: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_add_synonym_publishes_new_snapshot() {
        let org = Uuid::new_v4();
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(store.clone(), SynonymSnapshot::default());

        admin
            .add_custom_synonym(new_synonym(org, "SQL", &["PostgreSQL"]))
            .await
            .unwrap();

        let canon = SkillCanonicalizer::new(admin.snapshots.load(), Some(org), None);
        assert_eq!(canon.resolve("postgresql").name(), "SQL");
        assert_eq!(store.synonyms.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_synonym_list_rejected_without_write() {
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(store.clone(), SynonymSnapshot::default());

        let err = admin
            .add_custom_synonym(new_synonym(Uuid::new_v4(), "SQL", &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, SnapshotError::EmptyList(_)));
        assert!(store.synonyms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_org_mapping_rejected() {
        let org = Uuid::new_v4();
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(
            store.clone(),
            SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["Postgres"])]),
        );

        let err = admin
            .add_custom_synonym(new_synonym(org, "PostgreSQL", &["postgres"]))
            .await
            .unwrap_err();

        assert!(matches!(err, SnapshotError::ConflictingMapping { .. }));
        assert!(store.synonyms.lock().unwrap().is_empty());
        let canon = SkillCanonicalizer::new(admin.snapshots.load(), Some(org), None);
        assert_eq!(canon.resolve("Postgres").name(), "SQL");
    }

    #[tokio::test]
    async fn test_duplicate_synonym_entry_rejected() {
        let org = Uuid::new_v4();
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(
            store,
            SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["Postgres"])]),
        );

        let err = admin
            .add_custom_synonym(new_synonym(org, "sql", &["MySQL"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateEntry(_)));
    }

    #[tokio::test]
    async fn test_same_literal_allowed_in_other_org() {
        let org = Uuid::new_v4();
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(
            store,
            SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["Postgres"])]),
        );

        let added = admin
            .add_custom_synonym(new_synonym(Uuid::new_v4(), "PostgreSQL", &["Postgres"]))
            .await;
        assert!(added.is_ok());
    }

    #[tokio::test]
    async fn test_taxonomy_conflict_within_industry_rejected() {
        let store = Arc::new(InMemoryTaxonomyStore::default());
        let admin = admin_with(
            store.clone(),
            SynonymSnapshot::build(vec![taxonomy("it", "Go", &["golang"])], vec![]),
        );

        let err = admin
            .add_taxonomy_entry(NewTaxonomyEntry {
                industry: "IT".to_string(),
                skill: "Golang".to_string(),
                variants: vec!["golang".to_string()],
                is_active: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::ConflictingMapping { .. }));
        assert!(store.taxonomy.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reload_reads_store() {
        let store = Arc::new(InMemoryTaxonomyStore::default());
        store
            .taxonomy
            .lock()
            .unwrap()
            .push(taxonomy("it", "Kubernetes", &["k8s"]));
        let admin = admin_with(store, SynonymSnapshot::default());

        admin.reload().await.unwrap();

        let canon = SkillCanonicalizer::new(admin.snapshots.load(), None, None);
        assert_eq!(canon.resolve("k8s").name(), "Kubernetes");
    }
}
