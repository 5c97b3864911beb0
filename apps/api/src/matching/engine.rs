//! Scores one resume against one vacancy: canonicalize both sides, run the
//! three signals, reduce them with the weights of the routed model version,
//! then verify experience.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::matching::aggregator::{aggregate, Recommendation, SignalWeights};
use crate::matching::experience::{verify_experience, ExperienceRequirement, ExperienceVerification};
use crate::matching::keyword::{match_requirement, score_keywords, MatchKind};
use crate::matching::signal::SignalScore;
use crate::matching::tfidf::{score_tfidf, TfIdfIndex, WeightedKeyword};
use crate::matching::vector::{candidate_text, score_vector, vacancy_text, EmbeddingProvider};
use crate::models::profile::{ResumeProfile, VacancyRequirement};
use crate::registry::model_registry::ModelRegistry;
use crate::skills::canonicalizer::SkillCanonicalizer;
use crate::skills::snapshot::{SnapshotHandle, SynonymSnapshot};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedSkill {
    pub skill: String,
    pub kind: MatchKind,
    pub mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSkill {
    pub skill: String,
    pub mandatory: bool,
}

/// Full, explainable outcome of one resume-vacancy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub resume_id: Uuid,
    pub vacancy_id: Option<Uuid>,
    /// Version whose weights were applied; `None` means default weights.
    pub model_version_id: Option<Uuid>,
    pub keyword: SignalScore,
    pub tfidf: SignalScore,
    pub vector: SignalScore,
    pub vector_similarity: f64,
    pub tfidf_matched: Vec<WeightedKeyword>,
    pub tfidf_missing: Vec<WeightedKeyword>,
    pub aggregate_score: f64,
    pub recommendation: Recommendation,
    pub overall_passed: bool,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub experience_verification: Vec<ExperienceVerification>,
    pub processing_time_ms: u64,
}

impl MatchResult {
    pub fn matched_count(&self) -> usize {
        self.matched_skills.len()
    }

    /// Every skill the evaluation looked at, matched or missing.
    pub fn referenced_skills(&self) -> impl Iterator<Item = &str> {
        self.matched_skills
            .iter()
            .map(|s| s.skill.as_str())
            .chain(self.missing_skills.iter().map(|s| s.skill.as_str()))
    }
}

/// Builds TF-IDF document frequencies from raw vacancy skill lists, keyed the
/// way the organization-agnostic canonicalizer keys them.
pub fn build_tfidf_index(snapshot: Arc<SynonymSnapshot>, corpus: &[Vec<String>]) -> TfIdfIndex {
    let canon = SkillCanonicalizer::new(snapshot, None, None);
    TfIdfIndex::from_corpus(corpus.iter().map(|doc| {
        doc.iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| canon.key_of(s))
            .collect::<Vec<String>>()
    }))
}

pub struct MatchEngine {
    snapshots: Arc<SnapshotHandle>,
    tfidf: RwLock<Arc<TfIdfIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
    registry: Arc<ModelRegistry>,
    model_name: String,
}

impl MatchEngine {
    pub fn new(
        snapshots: Arc<SnapshotHandle>,
        tfidf: TfIdfIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        registry: Arc<ModelRegistry>,
        model_name: String,
    ) -> Self {
        Self {
            snapshots,
            tfidf: RwLock::new(Arc::new(tfidf)),
            embedder,
            registry,
            model_name,
        }
    }

    fn index(&self) -> Arc<TfIdfIndex> {
        match self.tfidf.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Recomputes TF-IDF weights against the current synonym snapshot.
    pub fn rebuild_index(&self, corpus: &[Vec<String>]) {
        let next = Arc::new(build_tfidf_index(self.snapshots.load(), corpus));
        debug!(documents = next.documents(), "tf-idf index rebuilt");
        match self.tfidf.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub async fn evaluate(
        &self,
        profile: &ResumeProfile,
        vacancy: &VacancyRequirement,
        organization_id: Option<Uuid>,
    ) -> Result<MatchResult, MatchError> {
        self.evaluate_at(profile, vacancy, organization_id, Utc::now().date_naive())
            .await
    }

    /// As [`evaluate`](Self::evaluate), with open-ended roles running to `as_of`.
    pub async fn evaluate_at(
        &self,
        profile: &ResumeProfile,
        vacancy: &VacancyRequirement,
        organization_id: Option<Uuid>,
        as_of: NaiveDate,
    ) -> Result<MatchResult, MatchError> {
        let started = Instant::now();
        vacancy.validate().map_err(MatchError::Validation)?;

        let canon = SkillCanonicalizer::new(
            self.snapshots.load(),
            organization_id,
            vacancy.industry.clone(),
        );

        let candidate = canon.canonical_set(&profile.skills);
        let mandatory = canon.canonical_set(&vacancy.mandatory_skills);
        let mut required = mandatory.clone();
        required.extend(&canon.canonical_set(&vacancy.additional_skills));

        let keyword = score_keywords(&mandatory, &candidate, &canon);
        let tfidf = score_tfidf(&self.index(), &required, &candidate, &canon);

        let canonical_profile = ResumeProfile {
            skills: candidate.names(),
            ..profile.clone()
        };
        let vector = score_vector(
            self.embedder.as_ref(),
            &candidate_text(&canonical_profile),
            &vacancy_text(vacancy),
        )
        .await;

        let (model_version_id, weights) = self.select_weights(profile.resume_id).await;
        let signals = [keyword.score, tfidf.score, vector.score];
        let verdict = aggregate(&signals, &weights);

        let mut matched_skills = Vec::new();
        let mut missing_skills = Vec::new();
        for (key, skill) in required.iter() {
            let is_mandatory = mandatory.contains_key(key);
            match match_requirement(skill, &candidate, &canon) {
                Some(kind) => matched_skills.push(MatchedSkill {
                    skill: skill.name.clone(),
                    kind,
                    mandatory: is_mandatory,
                }),
                None => missing_skills.push(MissingSkill {
                    skill: skill.name.clone(),
                    mandatory: is_mandatory,
                }),
            }
        }

        let requirements: Vec<ExperienceRequirement> = vacancy
            .required_experience
            .iter()
            .map(|(raw, months)| {
                let skill = canon.canonicalize(raw);
                ExperienceRequirement {
                    key: skill.key(),
                    skill: skill.name,
                    required_months: *months,
                }
            })
            .collect();
        let experience_verification =
            verify_experience(&profile.work_history, &requirements, as_of, |s| canon.key_of(s));

        let processing_time_ms = started.elapsed().as_millis() as u64;
        debug!(
            resume_id = %profile.resume_id,
            score = verdict.score,
            recommendation = verdict.recommendation.as_str(),
            processing_time_ms,
            "match evaluated"
        );

        Ok(MatchResult {
            resume_id: profile.resume_id,
            vacancy_id: vacancy.vacancy_id,
            model_version_id,
            keyword: keyword.score,
            tfidf: tfidf.score,
            vector: vector.score,
            vector_similarity: vector.similarity,
            tfidf_matched: tfidf.matched,
            tfidf_missing: tfidf.missing,
            aggregate_score: verdict.score,
            recommendation: verdict.recommendation,
            overall_passed: verdict.overall_passed,
            matched_skills,
            missing_skills,
            experience_verification,
            processing_time_ms,
        })
    }

    async fn select_weights(&self, resume_id: Uuid) -> (Option<Uuid>, SignalWeights) {
        match self.registry.route(&self.model_name, resume_id).await {
            Ok(Some(version)) => {
                let weights = version.config().weights.unwrap_or_default();
                (Some(version.id), weights)
            }
            Ok(None) => (None, SignalWeights::default()),
            Err(e) => {
                warn!(model = %self.model_name, "model registry unavailable, using default weights: {e}");
                (None, SignalWeights::default())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::{engine, engine_with, profile, registry, vacancy};
    use super::*;
    use crate::matching::vector::fakes::MarkerEmbeddings;
    use crate::matching::vector::DisabledEmbeddingProvider;
    use crate::models::profile::WorkHistoryEntry;
    use crate::registry::model_registry::NewModelVersion;
    use crate::skills::snapshot::fixtures::synonym;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_org_synonym_end_to_end() {
        let org = Uuid::new_v4();
        let snapshot = SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["PostgreSQL"])]);
        let engine = engine(snapshot);

        let result = engine
            .evaluate(&profile(&["Python", "PostgreSQL"]), &vacancy(&["Python", "SQL"], &[]), Some(org))
            .await
            .unwrap();

        let matched: Vec<&str> = result.matched_skills.iter().map(|s| s.skill.as_str()).collect();
        assert_eq!(matched, vec!["Python", "SQL"]);
        assert!(result.missing_skills.is_empty());
        assert_eq!(result.keyword.score, 1.0);
        assert!(result.keyword.passed);
        assert_eq!(result.matched_skills[1].kind, MatchKind::Synonym);
    }

    #[tokio::test]
    async fn test_synonym_does_not_leak_to_other_org() {
        let org = Uuid::new_v4();
        let snapshot = SynonymSnapshot::build(vec![], vec![synonym(org, "SQL", &["PostgreSQL"])]);
        let engine = engine(snapshot);

        let result = engine
            .evaluate(
                &profile(&["Python", "PostgreSQL"]),
                &vacancy(&["Python", "SQL"], &[]),
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();

        assert_eq!(result.keyword.score, 0.5);
        assert_eq!(result.missing_skills.len(), 1);
        assert_eq!(result.missing_skills[0].skill, "SQL");
    }

    #[tokio::test]
    async fn test_full_match_is_excellent() {
        let engine = engine(SynonymSnapshot::default());
        let result = engine
            .evaluate(&profile(&["Rust", "Go"]), &vacancy(&["Rust"], &["Go"]), None)
            .await
            .unwrap();

        assert_eq!(result.tfidf.score, 1.0);
        assert!((result.vector_similarity - 1.0).abs() < 1e-9);
        assert!((result.aggregate_score - 1.0).abs() < 1e-9);
        assert_eq!(result.recommendation, Recommendation::Excellent);
        assert!(result.overall_passed);
        assert!(result.matched_skills.iter().any(|s| s.skill == "Go" && !s.mandatory));
    }

    #[tokio::test]
    async fn test_mean_landing_on_pass_threshold_is_good() {
        let engine = engine_with(
            SynonymSnapshot::default(),
            Arc::new(MarkerEmbeddings("Zig")),
            registry(),
        );
        let additional = [
            "Python", "Linux", "Redis", "Nginx", "Ansible", "Jenkins", "Elixir", "Scala", "Kotlin",
            "Swift", "Svelte", "Django", "Flask", "Spark", "Hadoop", "Airflow",
        ];
        let mut held = vec!["Zig", "Rust", "Kafka", "Docker", "Terraform", "GraphQL"];
        held.extend(additional);
        let job = vacancy(
            &["Rust", "Kafka", "Docker", "Terraform", "GraphQL", "Haskell", "Erlang", "Fortran"],
            &additional,
        );

        let result = engine.evaluate(&profile(&held), &job, None).await.unwrap();

        assert_eq!(result.keyword.score, 0.625);
        assert_eq!(result.tfidf.score, 0.875);
        assert_eq!(result.vector.score, 0.0);
        assert_eq!(result.aggregate_score, 0.5);
        assert_eq!(result.recommendation, Recommendation::Good);
        assert!(result.overall_passed);
    }

    #[tokio::test]
    async fn test_disabled_embeddings_degrade_vector_only() {
        let engine = engine_with(
            SynonymSnapshot::default(),
            Arc::new(DisabledEmbeddingProvider),
            registry(),
        );
        let result = engine
            .evaluate(&profile(&["Rust"]), &vacancy(&["Rust"], &[]), None)
            .await
            .unwrap();

        assert!(result.vector.degraded);
        assert!(!result.vector.passed);
        assert_eq!(result.vector.score, 0.0);
        // keyword and tf-idf both 1.0; vector excluded rather than counted as 0
        assert!((result.aggregate_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_active_version_weights_apply() {
        let registry = registry();
        let version = registry
            .create(NewModelVersion {
                model_name: "unified-matcher".to_string(),
                version: "keyword-only".to_string(),
                is_active: true,
                is_experiment: false,
                experiment_config: json!({"weights": {"keyword": 1.0, "tfidf": 0.0, "vector": 0.0}}),
            })
            .await
            .unwrap();
        let engine = engine_with(
            SynonymSnapshot::default(),
            Arc::new(DisabledEmbeddingProvider),
            registry,
        );

        let result = engine
            .evaluate(&profile(&["Rust"]), &vacancy(&["Rust", "Kafka"], &[]), None)
            .await
            .unwrap();

        assert_eq!(result.model_version_id, Some(version.id));
        assert!((result.aggregate_score - 0.5).abs() < 1e-9);
        assert_eq!(result.recommendation, Recommendation::Good);
    }

    #[tokio::test]
    async fn test_experience_uses_interval_union() {
        let engine = engine(SynonymSnapshot::default());
        let mut candidate = profile(&["Python"]);
        candidate.work_history = vec![
            WorkHistoryEntry {
                company: "Acme".to_string(),
                position: "Engineer".to_string(),
                start_date: date(2023, 1, 1),
                end_date: Some(date(2023, 6, 30)),
                skills: vec!["python".to_string()],
            },
            WorkHistoryEntry {
                company: "Globex".to_string(),
                position: "Consultant".to_string(),
                start_date: date(2023, 3, 1),
                end_date: Some(date(2023, 9, 30)),
                skills: vec!["Python".to_string()],
            },
        ];
        let mut job = vacancy(&["Python"], &[]);
        job.required_experience.insert("Python".to_string(), 12);

        let result = engine
            .evaluate_at(&candidate, &job, None, date(2024, 1, 1))
            .await
            .unwrap();

        let verification = &result.experience_verification[0];
        assert_eq!(verification.skill, "Python");
        assert_eq!(verification.total_months, 9);
        assert!(!verification.meets_requirement);
        assert_eq!(verification.projects.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_requirement_rejected() {
        let engine = engine(SynonymSnapshot::default());
        let err = engine
            .evaluate(&profile(&["Rust"]), &vacancy(&["Rust", "  "], &[]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rebuild_index_weights_rare_skills() {
        let engine = engine(SynonymSnapshot::default());
        let corpus = vec![
            vec!["SQL".to_string(), "Rust".to_string()],
            vec!["SQL".to_string()],
            vec!["SQL".to_string()],
        ];
        engine.rebuild_index(&corpus);

        let result = engine
            .evaluate(&profile(&["SQL"]), &vacancy(&["SQL"], &["Rust"]), None)
            .await
            .unwrap();

        // Rust is rarer than SQL, so missing it costs more than half
        assert!(result.tfidf.score < 0.5);
        assert_eq!(result.tfidf_missing[0].keyword, "Rust");
    }
}
