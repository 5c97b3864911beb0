//! Unified Score Aggregator: pure reducer over the three signal scores.

use serde::{Deserialize, Serialize};

use crate::matching::signal::{Signal, SignalScore};

/// Per-signal relative weights. `aggregate` divides by their sum, so they
/// need not add up to 1. Defaults to equal weighting; an active model version
/// may override them through its experiment config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub keyword: f64,
    pub tfidf: f64,
    pub vector: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            keyword: 1.0,
            tfidf: 1.0,
            vector: 1.0,
        }
    }
}

impl SignalWeights {
    pub fn weight(&self, signal: Signal) -> f64 {
        let w = match signal {
            Signal::Keyword => self.keyword,
            Signal::Tfidf => self.tfidf,
            Signal::Vector => self.vector,
        };
        if w.is_finite() {
            w.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Excellent,
    Good,
    Maybe,
    Poor,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.70 {
            Recommendation::Excellent
        } else if score >= 0.50 {
            Recommendation::Good
        } else if score >= 0.30 {
            Recommendation::Maybe
        } else {
            Recommendation::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Excellent => "excellent",
            Recommendation::Good => "good",
            Recommendation::Maybe => "maybe",
            Recommendation::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub score: f64,
    pub recommendation: Recommendation,
    pub overall_passed: bool,
}

/// The aggregate is rounded to 12 decimal places. Drops the rounding residue of the
/// weighted sum so a mean that is exactly on a threshold compares as such.
const SCORE_PRECISION: f64 = 1e12;

/// Weighted mean of the non-degraded signals, weights renormalized over what
/// remains. No usable signal (all degraded or all zero-weight) yields 0.
pub fn aggregate(signals: &[SignalScore], weights: &SignalWeights) -> Aggregate {
    let (weighted, total) = signals
        .iter()
        .filter(|s| !s.degraded)
        .map(|s| (s.score, weights.weight(s.signal)))
        .fold((0.0, 0.0), |(acc, tot), (score, w)| (acc + score * w, tot + w));

    let score = if total > 0.0 {
        (((weighted / total) * SCORE_PRECISION).round() / SCORE_PRECISION).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Aggregate {
        score,
        recommendation: Recommendation::from_score(score),
        overall_passed: score >= 0.50,
    }
}
