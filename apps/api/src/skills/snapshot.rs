use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::taxonomy::{CustomSynonymEntry, SkillTaxonomyEntry};
use crate::skills::normalize::{fold, lookup_key};

/// Immutable, fully indexed view of the taxonomy and all org synonym lists.
///
/// Built once per admin write and shared behind an `Arc`; never mutated in place.
/// When two active entries from the same source claim the same literal, the
/// older entry (by `created_at`, then id) keeps it.
#[derive(Debug, Default)]
pub struct SynonymSnapshot {
    taxonomy: Vec<SkillTaxonomyEntry>,
    synonyms: Vec<CustomSynonymEntry>,
    taxonomy_canonicals: HashSet<String>,
    org_canonicals: HashMap<Uuid, HashSet<String>>,
    /// org -> lookup key -> canonical
    org_variants: HashMap<Uuid, HashMap<String, String>>,
    /// industry key -> lookup key -> canonical
    taxonomy_variants: BTreeMap<String, HashMap<String, String>>,
    /// folded literal -> canonical, sorted by folded literal
    org_folded: HashMap<Uuid, Vec<(String, String)>>,
    taxonomy_folded: Vec<(String, String)>,
}

impl SynonymSnapshot {
    pub fn build(
        mut taxonomy: Vec<SkillTaxonomyEntry>,
        mut synonyms: Vec<CustomSynonymEntry>,
    ) -> Self {
        taxonomy.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        synonyms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut taxonomy_canonicals = HashSet::new();
        let mut taxonomy_variants: BTreeMap<String, HashMap<String, String>> = BTreeMap::new();
        let mut taxonomy_folded: BTreeMap<String, String> = BTreeMap::new();

        for entry in taxonomy.iter().filter(|e| e.is_active) {
            taxonomy_canonicals.insert(entry.skill.clone());
            let variants = taxonomy_variants
                .entry(lookup_key(&entry.industry))
                .or_default();
            for literal in std::iter::once(&entry.skill).chain(entry.variants.iter()) {
                variants
                    .entry(lookup_key(literal))
                    .or_insert_with(|| entry.skill.clone());
                taxonomy_folded
                    .entry(fold(literal))
                    .or_insert_with(|| entry.skill.clone());
            }
        }

        let mut org_canonicals: HashMap<Uuid, HashSet<String>> = HashMap::new();
        let mut org_variants: HashMap<Uuid, HashMap<String, String>> = HashMap::new();
        let mut org_folded: HashMap<Uuid, BTreeMap<String, String>> = HashMap::new();

        for entry in synonyms.iter().filter(|e| e.is_active) {
            let org = entry.organization_id;
            org_canonicals
                .entry(org)
                .or_default()
                .insert(entry.canonical_skill.clone());
            let variants = org_variants.entry(org).or_default();
            let folded = org_folded.entry(org).or_default();
            for literal in
                std::iter::once(&entry.canonical_skill).chain(entry.custom_synonyms.iter())
            {
                variants
                    .entry(lookup_key(literal))
                    .or_insert_with(|| entry.canonical_skill.clone());
                folded
                    .entry(fold(literal))
                    .or_insert_with(|| entry.canonical_skill.clone());
            }
        }

        Self {
            taxonomy,
            synonyms,
            taxonomy_canonicals,
            org_canonicals,
            org_variants,
            taxonomy_variants,
            org_folded: org_folded
                .into_iter()
                .map(|(org, map)| (org, map.into_iter().collect()))
                .collect(),
            taxonomy_folded: taxonomy_folded.into_iter().collect(),
        }
    }

    pub fn taxonomy(&self) -> &[SkillTaxonomyEntry] {
        &self.taxonomy
    }

    pub fn synonyms(&self) -> &[CustomSynonymEntry] {
        &self.synonyms
    }

    /// True when `literal` is, verbatim, the canonical name of an active entry.
    pub fn is_canonical(&self, organization_id: Option<Uuid>, literal: &str) -> bool {
        let org_hit = organization_id
            .and_then(|org| self.org_canonicals.get(&org))
            .is_some_and(|names| names.contains(literal));
        org_hit || self.taxonomy_canonicals.contains(literal)
    }

    pub fn org_mapping(&self, organization_id: Uuid, key: &str) -> Option<&str> {
        self.org_variants
            .get(&organization_id)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Taxonomy lookup; the hinted industry is searched before the others.
    pub fn taxonomy_mapping(&self, industry: Option<&str>, key: &str) -> Option<&str> {
        let hinted = industry.map(lookup_key);
        if let Some(hit) = hinted
            .as_deref()
            .and_then(|ind| self.taxonomy_variants.get(ind))
            .and_then(|m| m.get(key))
        {
            return Some(hit);
        }
        self.taxonomy_variants
            .iter()
            .filter(|(ind, _)| Some(ind.as_str()) != hinted.as_deref())
            .find_map(|(_, m)| m.get(key))
            .map(String::as_str)
    }

    /// Lookup restricted to one industry (used when validating taxonomy writes).
    pub fn industry_mapping(&self, industry: &str, key: &str) -> Option<&str> {
        self.taxonomy_variants
            .get(&lookup_key(industry))
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    pub fn org_fold_candidates(&self, organization_id: Uuid) -> &[(String, String)] {
        self.org_folded
            .get(&organization_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn taxonomy_fold_candidates(&self) -> &[(String, String)] {
        &self.taxonomy_folded
    }
}

/// Holder for the current snapshot. Readers clone the `Arc`; writers
/// serialize on `writer` and replace the whole snapshot.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<SynonymSnapshot>>,
    writer: Mutex<()>,
}

impl SnapshotHandle {
    pub fn new(snapshot: SynonymSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<SynonymSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Serializes admin writers. Hold the guard across validate → persist → swap.
    pub async fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    pub fn swap(&self, snapshot: SynonymSnapshot) {
        let next = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{synonym, taxonomy};
    use super::*;

    #[test]
    fn test_taxonomy_lookup_is_case_insensitive() {
        let snap = SynonymSnapshot::build(vec![taxonomy("it", "React.js", &["ReactJS"])], vec![]);
        assert_eq!(snap.taxonomy_mapping(None, "reactjs"), Some("React.js"));
        assert_eq!(snap.taxonomy_mapping(None, "react.js"), Some("React.js"));
    }

    #[test]
    fn test_industry_hint_searched_first() {
        let snap = SynonymSnapshot::build(
            vec![
                taxonomy("finance", "Risk Modeling", &["RM"]),
                taxonomy("it", "Release Management", &["RM"]),
            ],
            vec![],
        );
        assert_eq!(snap.taxonomy_mapping(Some("IT"), "rm"), Some("Release Management"));
        assert_eq!(snap.taxonomy_mapping(Some("finance"), "rm"), Some("Risk Modeling"));
    }

    #[test]
    fn test_inactive_entries_ignored() {
        let mut entry = taxonomy("it", "Kubernetes", &["k8s"]);
        entry.is_active = false;
        let snap = SynonymSnapshot::build(vec![entry], vec![]);
        assert_eq!(snap.taxonomy_mapping(None, "k8s"), None);
        assert!(!snap.is_canonical(None, "Kubernetes"));
        assert_eq!(snap.taxonomy().len(), 1);
    }

    #[test]
    fn test_org_mapping_scoped_to_org() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();
        let snap = SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["PostgreSQL"])]);
        assert_eq!(snap.org_mapping(org, "postgresql"), Some("SQL"));
        assert_eq!(snap.org_mapping(other, "postgresql"), None);
        assert!(snap.is_canonical(Some(org), "SQL"));
        assert!(!snap.is_canonical(Some(other), "SQL"));
    }

    #[test]
    fn test_older_entry_keeps_conflicting_variant() {
        let mut newer = taxonomy("it", "Golang", &["go"]);
        newer.created_at = chrono::Utc::now();
        let older = taxonomy("it", "Go", &["go"]);
        let snap = SynonymSnapshot::build(vec![newer, older], vec![]);
        assert_eq!(snap.taxonomy_mapping(None, "go"), Some("Go"));
    }

    #[test]
    fn test_handle_swap_replaces_snapshot() {
        let handle = SnapshotHandle::new(SynonymSnapshot::default());
        let before = handle.load();
        handle.swap(SynonymSnapshot::build(vec![taxonomy("it", "Rust", &[])], vec![]));
        assert!(!before.is_canonical(None, "Rust"));
        assert!(handle.load().is_canonical(None, "Rust"));
    }
}
