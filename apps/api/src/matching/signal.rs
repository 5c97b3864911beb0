use serde::{Deserialize, Serialize};

/// The independently sourced scoring signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Keyword,
    Tfidf,
    Vector,
}

impl Signal {
    /// Minimum score for the signal to count as passed.
    pub fn pass_threshold(self) -> f64 {
        match self {
            Signal::Keyword => 0.30,
            Signal::Tfidf => 0.30,
            Signal::Vector => 0.50,
        }
    }
}

/// One signal's verdict. A degraded signal could not be computed (its external
/// dependency failed) and is excluded from aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    pub signal: Signal,
    pub score: f64,
    pub passed: bool,
    pub degraded: bool,
}

impl SignalScore {
    pub fn new(signal: Signal, score: f64) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            signal,
            score,
            passed: score >= signal.pass_threshold(),
            degraded: false,
        }
    }

    pub fn degraded(signal: Signal) -> Self {
        Self {
            signal,
            score: 0.0,
            passed: false,
            degraded: true,
        }
    }
}
