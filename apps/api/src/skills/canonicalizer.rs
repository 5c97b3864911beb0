//! Skill Canonicalizer: resolves raw skill tokens to canonical names.
//!
//! Resolution is an ordered chain of typed resolvers:
//! exact canonical → org custom synonym → global taxonomy → fuzzy → unresolved.
//! The first resolver that answers wins, so every input has exactly one output
//! for a given snapshot, organization and industry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strsim::damerau_levenshtein;
use uuid::Uuid;

use crate::skills::normalize::{compound_parts, fold, lookup_key};
use crate::skills::snapshot::SynonymSnapshot;

/// Minimum folded length before edit-distance matching is attempted.
const FUZZY_MIN_LEN: usize = 5;
/// Folded length from which a distance of 2 is tolerated.
const FUZZY_WIDE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Exact,
    OrgSynonym,
    Taxonomy,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        canonical: String,
        source: ResolutionSource,
    },
    Unresolved {
        original: String,
    },
}

impl Resolution {
    pub fn name(&self) -> &str {
        match self {
            Resolution::Resolved { canonical, .. } => canonical,
            Resolution::Unresolved { original } => original,
        }
    }

    pub fn source(&self) -> Option<ResolutionSource> {
        match self {
            Resolution::Resolved { source, .. } => Some(*source),
            Resolution::Unresolved { .. } => None,
        }
    }
}

/// Lookup scope shared by every resolver in the chain.
struct ResolveScope<'a> {
    snapshot: &'a SynonymSnapshot,
    organization_id: Option<Uuid>,
    industry: Option<&'a str>,
}

trait SkillResolver: Sync {
    fn source(&self) -> ResolutionSource;
    fn resolve(&self, scope: &ResolveScope<'_>, literal: &str) -> Option<String>;
}

/// The literal already is a canonical name, and the organization does not remap it.
struct ExactResolver;

impl SkillResolver for ExactResolver {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Exact
    }

    fn resolve(&self, scope: &ResolveScope<'_>, literal: &str) -> Option<String> {
        if let Some(org) = scope.organization_id {
            let remapped = scope
                .snapshot
                .org_mapping(org, &lookup_key(literal))
                .is_some_and(|canonical| canonical != literal);
            if remapped {
                return None;
            }
        }
        scope
            .snapshot
            .is_canonical(scope.organization_id, literal)
            .then(|| literal.to_string())
    }
}

struct OrgSynonymResolver;

impl SkillResolver for OrgSynonymResolver {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::OrgSynonym
    }

    fn resolve(&self, scope: &ResolveScope<'_>, literal: &str) -> Option<String> {
        let org = scope.organization_id?;
        scope
            .snapshot
            .org_mapping(org, &lookup_key(literal))
            .map(str::to_string)
    }
}

struct TaxonomyResolver;

impl SkillResolver for TaxonomyResolver {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Taxonomy
    }

    fn resolve(&self, scope: &ResolveScope<'_>, literal: &str) -> Option<String> {
        scope
            .snapshot
            .taxonomy_mapping(scope.industry, &lookup_key(literal))
            .map(str::to_string)
    }
}

/// Folded equality first, then bounded Damerau–Levenshtein distance.
/// Org candidates beat taxonomy candidates at equal distance.
struct FuzzyResolver;

impl SkillResolver for FuzzyResolver {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Fuzzy
    }

    fn resolve(&self, scope: &ResolveScope<'_>, literal: &str) -> Option<String> {
        let folded = fold(literal);
        if folded.is_empty() {
            return None;
        }

        let org_candidates = scope
            .organization_id
            .map(|org| scope.snapshot.org_fold_candidates(org))
            .unwrap_or(&[]);
        let sources: [(u8, &[(String, String)]); 2] = [
            (0, org_candidates),
            (1, scope.snapshot.taxonomy_fold_candidates()),
        ];

        for (_, candidates) in &sources {
            if let Ok(idx) = candidates.binary_search_by(|(key, _)| key.as_str().cmp(folded.as_str())) {
                return Some(candidates[idx].1.clone());
            }
        }

        let len = folded.chars().count();
        if len < FUZZY_MIN_LEN {
            return None;
        }

        let mut best: Option<(usize, u8, &str)> = None;
        for (priority, candidates) in &sources {
            for (key, canonical) in candidates.iter() {
                let key_len = key.chars().count();
                if key_len < FUZZY_MIN_LEN {
                    continue;
                }
                let distance = damerau_levenshtein(&folded, key);
                let acceptable = distance == 1 || (len.max(key_len) >= FUZZY_WIDE_LEN && distance == 2);
                if !acceptable {
                    continue;
                }
                let candidate = (distance, *priority, canonical.as_str());
                if best.map_or(true, |current| candidate < current) {
                    best = Some(candidate);
                }
            }
        }

        best.map(|(_, _, canonical)| canonical.to_string())
    }
}

static CHAIN: [&dyn SkillResolver; 4] = [
    &ExactResolver,
    &OrgSynonymResolver,
    &TaxonomyResolver,
    &FuzzyResolver,
];

/// A raw token together with what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSkill {
    pub name: String,
    pub original: String,
    /// `None` when no resolver answered and the literal was kept.
    pub source: Option<ResolutionSource>,
}

impl CanonicalSkill {
    pub fn key(&self) -> String {
        lookup_key(&self.name)
    }
}

/// Canonicalized skill set keyed by lookup key; iteration order is by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalSkills {
    by_key: BTreeMap<String, CanonicalSkill>,
}

impl CanonicalSkills {
    pub fn insert(&mut self, skill: CanonicalSkill) {
        self.by_key.entry(skill.key()).or_insert(skill);
    }

    pub fn get(&self, key: &str) -> Option<&CanonicalSkill> {
        self.by_key.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CanonicalSkill)> {
        self.by_key.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.by_key.values().map(|s| s.name.clone()).collect()
    }

    /// Union; entries already present keep their resolution.
    pub fn extend(&mut self, other: &CanonicalSkills) {
        for skill in other.by_key.values() {
            self.insert(skill.clone());
        }
    }
}

/// Canonicalizer bound to one snapshot, organization and industry.
#[derive(Debug, Clone)]
pub struct SkillCanonicalizer {
    snapshot: Arc<SynonymSnapshot>,
    organization_id: Option<Uuid>,
    industry: Option<String>,
}

impl SkillCanonicalizer {
    pub fn new(
        snapshot: Arc<SynonymSnapshot>,
        organization_id: Option<Uuid>,
        industry: Option<String>,
    ) -> Self {
        Self {
            snapshot,
            organization_id,
            industry,
        }
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        let literal = raw.trim();
        let scope = ResolveScope {
            snapshot: &self.snapshot,
            organization_id: self.organization_id,
            industry: self.industry.as_deref(),
        };

        CHAIN
            .iter()
            .find_map(|resolver| {
                resolver
                    .resolve(&scope, literal)
                    .map(|canonical| Resolution::Resolved {
                        canonical,
                        source: resolver.source(),
                    })
            })
            .unwrap_or_else(|| {
                tracing::debug!(skill = literal, "skill left unresolved");
                Resolution::Unresolved {
                    original: literal.to_string(),
                }
            })
    }

    pub fn canonicalize(&self, raw: &str) -> CanonicalSkill {
        let resolution = self.resolve(raw);
        CanonicalSkill {
            name: resolution.name().to_string(),
            original: raw.trim().to_string(),
            source: resolution.source(),
        }
    }

    /// Canonical lookup key for a raw token.
    pub fn key_of(&self, raw: &str) -> String {
        lookup_key(self.resolve(raw).name())
    }

    pub fn canonical_set<S: AsRef<str>>(&self, raws: &[S]) -> CanonicalSkills {
        let mut set = CanonicalSkills::default();
        for raw in raws.iter().map(AsRef::as_ref).filter(|s| !s.trim().is_empty()) {
            set.insert(self.canonicalize(raw));
        }
        set
    }

    /// Canonical keys of each part of a multi-token requirement.
    /// Returns `None` for single-token input.
    pub fn compound_keys(&self, raw: &str) -> Option<Vec<String>> {
        let parts = compound_parts(raw);
        if parts.len() < 2 {
            return None;
        }
        Some(parts.into_iter().map(|p| self.key_of(p)).collect())
    }
}
