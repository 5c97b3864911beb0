//! TF-IDF Scorer: importance-weighted overlap.
//!
//! Each skill is weighted by how rare it is across the historical vacancy
//! corpus: `w = ln((N + 1) / (df + 1)) + 1`. A skill the corpus has never seen
//! gets the maximum weight. `score = Σ w(matched) / Σ w(required)`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::matching::keyword::match_requirement;
use crate::matching::signal::{Signal, SignalScore};
use crate::skills::canonicalizer::{CanonicalSkills, SkillCanonicalizer};

/// Document frequencies of canonical skill keys over the vacancy corpus.
#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
    documents: usize,
    document_frequency: HashMap<String, usize>,
}

impl TfIdfIndex {
    /// Builds the index from one key set per historical vacancy.
    /// Repeated keys inside one document count once.
    pub fn from_corpus<D, K>(documents: D) -> Self
    where
        D: IntoIterator,
        D::Item: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut count = 0;
        for doc in documents {
            count += 1;
            let unique: HashSet<String> = doc.into_iter().map(Into::into).collect();
            for key in unique {
                *document_frequency.entry(key).or_insert(0) += 1;
            }
        }
        Self {
            documents: count,
            document_frequency,
        }
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn weight(&self, key: &str) -> f64 {
        let n = self.documents as f64;
        let df = self.document_frequency.get(key).copied().unwrap_or(0) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub keyword: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TfIdfOutcome {
    pub score: SignalScore,
    /// Ordered by importance, highest first.
    pub matched: Vec<WeightedKeyword>,
    /// Ordered by importance, highest first, so gaps can be prioritized.
    pub missing: Vec<WeightedKeyword>,
}

pub fn score_tfidf(
    index: &TfIdfIndex,
    required: &CanonicalSkills,
    candidate: &CanonicalSkills,
    canon: &SkillCanonicalizer,
) -> TfIdfOutcome {
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut matched_weight = 0.0;
    let mut total_weight = 0.0;

    for (key, skill) in required.iter() {
        let importance = index.weight(key);
        total_weight += importance;
        let keyword = WeightedKeyword {
            keyword: skill.name.clone(),
            importance,
        };
        if match_requirement(skill, candidate, canon).is_some() {
            matched_weight += importance;
            matched.push(keyword);
        } else {
            missing.push(keyword);
        }
    }

    sort_by_importance(&mut matched);
    sort_by_importance(&mut missing);

    let score = if total_weight > 0.0 {
        matched_weight / total_weight
    } else {
        1.0
    };

    TfIdfOutcome {
        score: SignalScore::new(Signal::Tfidf, score),
        matched,
        missing,
    }
}

fn sort_by_importance(keywords: &mut [WeightedKeyword]) {
    keywords.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::skills::snapshot::SynonymSnapshot;

    fn canon() -> SkillCanonicalizer {
        SkillCanonicalizer::new(Arc::new(SynonymSnapshot::default()), None, None)
    }

    fn corpus() -> TfIdfIndex {
        TfIdfIndex::from_corpus(vec![
            vec!["sql", "python"],
            vec!["sql", "java"],
            vec!["sql", "python", "sql"],
            vec!["sql", "rust"],
        ])
    }

    #[test]
    fn test_rare_skills_weigh_more() {
        let index = corpus();
        assert_eq!(index.documents(), 4);
        assert!(index.weight("rust") > index.weight("python"));
        assert!(index.weight("python") > index.weight("sql"));
        assert!(index.weight("cobol") > index.weight("rust"));
    }

    #[test]
    fn test_duplicate_terms_in_document_count_once() {
        let index = corpus();
        // sql appears in all 4 docs: ln(5/5) + 1
        assert!((index.weight("sql") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_ordered_by_importance() {
        let c = canon();
        let index = corpus();
        let outcome = score_tfidf(
            &index,
            &c.canonical_set(&["sql", "python", "rust", "cobol"]),
            &c.canonical_set(&["sql"]),
            &c,
        );
        let missing: Vec<_> = outcome.missing.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(missing, vec!["cobol", "rust", "python"]);
        assert_eq!(outcome.matched.len(), 1);
    }

    #[test]
    fn test_rare_match_scores_higher_than_common_match() {
        let c = canon();
        let index = corpus();
        let required = c.canonical_set(&["sql", "rust"]);
        let rare = score_tfidf(&index, &required, &c.canonical_set(&["rust"]), &c);
        let common = score_tfidf(&index, &required, &c.canonical_set(&["sql"]), &c);
        assert!(rare.score.score > common.score.score);
        assert!(rare.score.score > 0.5);
        assert!(rare.score.passed);
    }

    #[test]
    fn test_empty_required_scores_one() {
        let c = canon();
        let outcome = score_tfidf(&corpus(), &CanonicalSkills::default(), &CanonicalSkills::default(), &c);
        assert_eq!(outcome.score.score, 1.0);
        assert!(outcome.score.passed);
    }

    #[test]
    fn test_empty_corpus_falls_back_to_plain_overlap() {
        let c = canon();
        let outcome = score_tfidf(
            &TfIdfIndex::default(),
            &c.canonical_set(&["a1", "b2"]),
            &c.canonical_set(&["a1"]),
            &c,
        );
        assert!((outcome.score.score - 0.5).abs() < 1e-9);
    }
}
