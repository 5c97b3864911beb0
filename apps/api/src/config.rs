use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Embedding provider endpoint. When unset the vector signal is always degraded.
    pub embedding_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout_ms: u64,
    pub compare_concurrency: usize,
    pub compare_timeout_ms: u64,
    /// Model name whose active (or experiment) version supplies aggregation weights.
    pub match_model_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let compare_concurrency: usize = parse_env("COMPARE_CONCURRENCY", 5)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            embedding_url: optional_env("EMBEDDING_URL"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_timeout_ms: parse_env("EMBEDDING_TIMEOUT_MS", 3000)?,
            compare_concurrency: compare_concurrency.clamp(1, 5),
            compare_timeout_ms: parse_env("COMPARE_TIMEOUT_MS", 5000)?,
            match_model_name: std::env::var("MATCH_MODEL_NAME")
                .unwrap_or_else(|_| "unified-matcher".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
