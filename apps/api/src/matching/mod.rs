// Unified resume-to-vacancy matching.
// Three independent signals (keyword, TF-IDF, vector) are reduced by a pure
// aggregator; the engine adds experience verification and the comparator fans
// the engine out across several resumes.

pub mod aggregator;
pub mod comparator;
pub mod engine;
pub mod experience;
pub mod handlers;
pub mod keyword;
pub mod report;
pub mod signal;
pub mod store;
pub mod tfidf;
pub mod vector;
