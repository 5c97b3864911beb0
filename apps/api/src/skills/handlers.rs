use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::errors::AppError;
use crate::models::taxonomy::{CustomSynonymEntry, SkillTaxonomyEntry};
use crate::skills::admin::{NewCustomSynonym, NewTaxonomyEntry};
use crate::state::AppState;

/// POST /api/v1/admin/synonyms
pub async fn handle_add_synonym(
    State(state): State<AppState>,
    Json(req): Json<NewCustomSynonym>,
) -> Result<(StatusCode, Json<CustomSynonymEntry>), AppError> {
    let entry = state.skill_admin.add_custom_synonym(req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/v1/admin/taxonomy
pub async fn handle_add_taxonomy(
    State(state): State<AppState>,
    Json(req): Json<NewTaxonomyEntry>,
) -> Result<(StatusCode, Json<SkillTaxonomyEntry>), AppError> {
    let entry = state.skill_admin.add_taxonomy_entry(req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/v1/admin/skills/reload
/// Re-reads taxonomy and synonyms, then re-keys the TF-IDF corpus against them.
pub async fn handle_reload(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.skill_admin.reload().await?;
    let corpus = state.profiles.vacancy_corpus().await?;
    state.engine.rebuild_index(&corpus);
    info!(documents = corpus.len(), "skill data reloaded");
    Ok(StatusCode::NO_CONTENT)
}
