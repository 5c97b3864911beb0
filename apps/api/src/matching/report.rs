//! Response shapes for the match endpoints, derived from a [`MatchResult`].

use serde::Serialize;
use uuid::Uuid;

use crate::matching::aggregator::Recommendation;
use crate::matching::engine::MatchResult;
use crate::matching::experience::ExperienceVerification;
use crate::matching::keyword::MatchKind;
use crate::matching::signal::Signal;
use crate::matching::tfidf::WeightedKeyword;

/// Missing TF-IDF keywords named in the assessment sentence.
const ASSESSMENT_GAPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStatus {
    pub skill: String,
    /// `exact | synonym | fuzzy | compound` for matched skills, `missing` otherwise.
    pub status: &'static str,
    /// Set for mandatory skills.
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResponse {
    pub resume_id: Uuid,
    pub match_percentage: u32,
    pub matched_skills: Vec<SkillStatus>,
    pub missing_skills: Vec<SkillStatus>,
    pub experience_verification: Vec<ExperienceVerification>,
    pub overall_assessment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedMatchResponse {
    pub resume_id: Uuid,
    pub model_version_id: Option<Uuid>,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub overall_passed: bool,
    pub keyword_score: f64,
    pub keyword_passed: bool,
    pub tfidf_score: f64,
    pub tfidf_passed: bool,
    pub tfidf_matched: Vec<WeightedKeyword>,
    pub tfidf_missing: Vec<WeightedKeyword>,
    pub vector_score: f64,
    pub vector_passed: bool,
    pub vector_similarity: f64,
    pub degraded_signals: Vec<Signal>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub processing_time_ms: u64,
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Exact => "exact",
        MatchKind::Synonym => "synonym",
        MatchKind::Fuzzy => "fuzzy",
        MatchKind::Compound => "compound",
    }
}

/// One-sentence summary: the bucket, then the most important gaps.
pub fn overall_assessment(recommendation: Recommendation, gaps: &[WeightedKeyword]) -> String {
    let headline = match recommendation {
        Recommendation::Excellent => "Excellent match: the candidate covers the core requirements",
        Recommendation::Good => "Good match: the candidate covers most requirements",
        Recommendation::Maybe => "Possible match: the candidate covers some requirements",
        Recommendation::Poor => "Poor match: the candidate covers few requirements",
    };

    let top: Vec<&str> = gaps
        .iter()
        .take(ASSESSMENT_GAPS)
        .map(|k| k.keyword.as_str())
        .collect();
    if top.is_empty() {
        format!("{headline}.")
    } else {
        format!("{headline}; key gaps: {}.", top.join(", "))
    }
}

impl From<&MatchResult> for MatchResponse {
    fn from(result: &MatchResult) -> Self {
        let matched_skills = result
            .matched_skills
            .iter()
            .map(|s| SkillStatus {
                skill: s.skill.clone(),
                status: kind_label(s.kind),
                highlight: s.mandatory,
            })
            .collect();
        let missing_skills = result
            .missing_skills
            .iter()
            .map(|s| SkillStatus {
                skill: s.skill.clone(),
                status: "missing",
                highlight: s.mandatory,
            })
            .collect();

        Self {
            resume_id: result.resume_id,
            match_percentage: (result.aggregate_score * 100.0).round() as u32,
            matched_skills,
            missing_skills,
            experience_verification: result.experience_verification.clone(),
            overall_assessment: overall_assessment(result.recommendation, &result.tfidf_missing),
        }
    }
}

impl From<&MatchResult> for UnifiedMatchResponse {
    fn from(result: &MatchResult) -> Self {
        let degraded_signals = [result.keyword, result.tfidf, result.vector]
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.signal)
            .collect();

        Self {
            resume_id: result.resume_id,
            model_version_id: result.model_version_id,
            overall_score: result.aggregate_score,
            recommendation: result.recommendation,
            overall_passed: result.overall_passed,
            keyword_score: result.keyword.score,
            keyword_passed: result.keyword.passed,
            tfidf_score: result.tfidf.score,
            tfidf_passed: result.tfidf.passed,
            tfidf_matched: result.tfidf_matched.clone(),
            tfidf_missing: result.tfidf_missing.clone(),
            vector_score: result.vector.score,
            vector_passed: result.vector.passed,
            vector_similarity: result.vector_similarity,
            degraded_signals,
            matched_skills: result.matched_skills.iter().map(|s| s.skill.clone()).collect(),
            missing_skills: result.missing_skills.iter().map(|s| s.skill.clone()).collect(),
            processing_time_ms: result.processing_time_ms,
        }
    }
}
