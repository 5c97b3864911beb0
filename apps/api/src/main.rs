mod config;
mod db;
mod errors;
mod matching;
mod models;
mod registry;
mod routes;
mod skills;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::matching::comparator::Comparator;
use crate::matching::engine::{build_tfidf_index, MatchEngine};
use crate::matching::store::{PgProfileStore, ProfileStore};
use crate::matching::vector::{DisabledEmbeddingProvider, EmbeddingProvider, HttpEmbeddingProvider};
use crate::registry::feedback::FeedbackLog;
use crate::registry::model_registry::ModelRegistry;
use crate::registry::store::{PgFeedbackStore, PgModelStore};
use crate::routes::build_router;
use crate::skills::admin::{load_snapshot, SkillAdmin};
use crate::skills::snapshot::SnapshotHandle;
use crate::skills::store::{PgTaxonomyStore, TaxonomyStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Skill synonyms and taxonomy
    let taxonomy_store: Arc<dyn TaxonomyStore> = Arc::new(PgTaxonomyStore::new(db.clone()));
    let snapshots = Arc::new(SnapshotHandle::new(load_snapshot(taxonomy_store.as_ref()).await?));
    let skill_admin = Arc::new(SkillAdmin::new(Arc::clone(&snapshots), taxonomy_store));

    // TF-IDF weights from the historical vacancy corpus
    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(db.clone()));
    let corpus = profiles.vacancy_corpus().await?;
    let tfidf = build_tfidf_index(snapshots.load(), &corpus);
    info!("TF-IDF index built from {} vacancies", tfidf.documents());

    let embedder = build_embedder(&config)?;

    let registry = Arc::new(ModelRegistry::new(Arc::new(PgModelStore::new(db.clone()))));
    let feedback = Arc::new(FeedbackLog::new(
        Arc::new(PgFeedbackStore::new(db.clone())),
        Arc::clone(&registry),
    ));

    let engine = Arc::new(MatchEngine::new(
        snapshots,
        tfidf,
        embedder,
        Arc::clone(&registry),
        config.match_model_name.clone(),
    ));
    let comparator = Arc::new(Comparator::new(
        Arc::clone(&engine),
        Arc::clone(&profiles),
        config.compare_concurrency,
        Duration::from_millis(config.compare_timeout_ms),
    ));
    info!(
        "Comparator: concurrency {} / timeout {} ms",
        config.compare_concurrency, config.compare_timeout_ms
    );

    // Build app state
    let state = AppState {
        profiles,
        engine,
        comparator,
        skill_admin,
        registry,
        feedback,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP provider when `EMBEDDING_URL` is set; otherwise the vector signal is
/// reported as degraded on every match.
fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding_url {
        Some(url) => {
            let provider = HttpEmbeddingProvider::new(
                url.clone(),
                config.embedding_api_key.clone(),
                Duration::from_millis(config.embedding_timeout_ms),
            )?;
            info!("Embedding provider: {url}");
            Ok(Arc::new(provider))
        }
        None => {
            warn!("EMBEDDING_URL not set; vector signal disabled");
            Ok(Arc::new(DisabledEmbeddingProvider))
        }
    }
}
