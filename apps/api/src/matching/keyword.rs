//! Keyword Matcher: set overlap over canonicalized skills.
//!
//! `score = |matched| / |required|`, 1.0 when nothing is required.
//! A multi-token requirement is satisfied by an exact compound match or by
//! every one of its parts being held individually.

use serde::{Deserialize, Serialize};

use crate::matching::signal::{Signal, SignalScore};
use crate::skills::canonicalizer::{
    CanonicalSkill, CanonicalSkills, ResolutionSource, SkillCanonicalizer,
};
use crate::skills::normalize::lookup_key;

/// How a required skill was found in the candidate's skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Fuzzy,
    Compound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillHit {
    pub skill: String,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordOutcome {
    pub score: SignalScore,
    pub matched: Vec<SkillHit>,
    pub missing: Vec<String>,
}

/// Decides whether `required` is covered by `candidate`.
pub fn match_requirement(
    required: &CanonicalSkill,
    candidate: &CanonicalSkills,
    canon: &SkillCanonicalizer,
) -> Option<MatchKind> {
    if let Some(held) = candidate.get(&required.key()) {
        let kind = if lookup_key(&held.original) == lookup_key(&required.original) {
            MatchKind::Exact
        } else if held.source == Some(ResolutionSource::Fuzzy)
            || required.source == Some(ResolutionSource::Fuzzy)
        {
            MatchKind::Fuzzy
        } else {
            MatchKind::Synonym
        };
        return Some(kind);
    }

    let parts = canon.compound_keys(&required.original)?;
    parts
        .iter()
        .all(|key| candidate.contains_key(key))
        .then_some(MatchKind::Compound)
}

pub fn score_keywords(
    required: &CanonicalSkills,
    candidate: &CanonicalSkills,
    canon: &SkillCanonicalizer,
) -> KeywordOutcome {
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for (_, skill) in required.iter() {
        match match_requirement(skill, candidate, canon) {
            Some(kind) => matched.push(SkillHit {
                skill: skill.name.clone(),
                kind,
            }),
            None => missing.push(skill.name.clone()),
        }
    }

    let score = if required.is_empty() {
        1.0
    } else {
        matched.len() as f64 / required.len() as f64
    };

    KeywordOutcome {
        score: SignalScore::new(Signal::Keyword, score),
        matched,
        missing,
    }
}
