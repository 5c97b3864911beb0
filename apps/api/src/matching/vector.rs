//! Vector Similarity Scorer: cosine similarity over externally supplied embeddings.
//!
//! The embedding provider is a collaborator. When it cannot answer, the signal
//! is reported as degraded instead of failing the match.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::matching::signal::{Signal, SignalScore};
use crate::models::profile::{ResumeProfile, VacancyRequirement};

const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is not configured")]
    Unavailable,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned an empty embedding")]
    EmptyEmbedding,
}

/// Source of embeddings. Implementations must be safe for concurrent use.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Used when no provider is configured; the vector signal is always degraded.
pub struct DisabledEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// JSON-over-HTTP embedding provider: POST `{"input": text}` → `{"embedding": [..]}`.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpEmbeddingProvider {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url,
            api_key,
        })
    }

    async fn call_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { input: text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    /// Retries once on transport errors and 5xx responses.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt = 1;
        loop {
            match self.call_once(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if attempt < MAX_ATTEMPTS && is_retryable(&err) => {
                    warn!("embedding call attempt {attempt} failed, retrying: {err}");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_retryable(err: &EmbeddingError) -> bool {
    match err {
        EmbeddingError::Http(_) => true,
        EmbeddingError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Raw cosine similarity in [-1, 1]. Dimension mismatch or a zero vector yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorOutcome {
    pub score: SignalScore,
    /// Unclamped cosine similarity; 0 when degraded.
    pub similarity: f64,
}

/// Text embedded for the candidate: skills, then positions held.
pub fn candidate_text(profile: &ResumeProfile) -> String {
    let positions = profile.work_history.iter().map(|e| e.position.as_str());
    profile
        .skills
        .iter()
        .map(String::as_str)
        .chain(positions)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text embedded for the vacancy: mandatory then additional skills.
pub fn vacancy_text(vacancy: &VacancyRequirement) -> String {
    vacancy
        .mandatory_skills
        .iter()
        .chain(vacancy.additional_skills.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn score_vector(
    provider: &dyn EmbeddingProvider,
    candidate: &str,
    vacancy: &str,
) -> VectorOutcome {
    let (candidate_vec, vacancy_vec) =
        tokio::join!(provider.embed(candidate), provider.embed(vacancy));

    match (candidate_vec, vacancy_vec) {
        (Ok(a), Ok(b)) => {
            let similarity = cosine_similarity(&a, &b);
            debug!(similarity, "vector similarity computed");
            VectorOutcome {
                score: SignalScore::new(Signal::Vector, similarity),
                similarity,
            }
        }
        (Err(err), _) | (_, Err(err)) => {
            warn!("vector signal degraded: {err}");
            VectorOutcome {
                score: SignalScore::degraded(Signal::Vector),
                similarity: 0.0,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{ConstantEmbeddings, FixedEmbeddings};
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatch_and_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_negative_similarity_clamped_to_zero_score() {
        let mut provider = FixedEmbeddings::default();
        provider.vectors.insert("a".to_string(), vec![1.0, 0.0]);
        provider.vectors.insert("b".to_string(), vec![-1.0, 0.0]);

        let outcome = score_vector(&provider, "a", "b").await;
        assert!((outcome.similarity + 1.0).abs() < 1e-9);
        assert_eq!(outcome.score.score, 0.0);
        assert!(!outcome.score.passed);
        assert!(!outcome.score.degraded);
    }

    #[tokio::test]
    async fn test_identical_text_passes() {
        let outcome = score_vector(&ConstantEmbeddings(vec![0.3, 0.4]), "x", "y").await;
        assert!(outcome.score.passed);
        assert!((outcome.score.score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let outcome = score_vector(&DisabledEmbeddingProvider, "a", "b").await;
        assert!(outcome.score.degraded);
        assert!(!outcome.score.passed);
        assert_eq!(outcome.similarity, 0.0);
    }

    #[test]
    fn test_candidate_text_includes_positions() {
        let profile = ResumeProfile {
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            work_history: vec![crate::models::profile::WorkHistoryEntry {
                company: "Acme".to_string(),
                position: "Backend Engineer".to_string(),
                start_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end_date: None,
                skills: vec![],
            }],
            ..Default::default()
        };
        assert_eq!(candidate_text(&profile), "Rust, SQL, Backend Engineer");
    }
}
