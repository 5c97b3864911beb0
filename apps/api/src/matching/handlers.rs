use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::comparator::{ComparisonMatrixData, ComparisonRequest};
use crate::matching::engine::MatchResult;
use crate::matching::report::{MatchResponse, UnifiedMatchResponse};
use crate::models::profile::VacancyRequirement;
use crate::state::AppState;

/// Body of both match endpoints. The vacancy is given inline or by id.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub vacancy_id: Option<Uuid>,
    #[serde(default)]
    pub vacancy_data: Option<VacancyRequirement>,
}

async fn run_match(state: &AppState, req: MatchRequest) -> Result<MatchResult, AppError> {
    let vacancy = match (req.vacancy_data, req.vacancy_id) {
        (Some(mut data), id) => {
            if data.vacancy_id.is_none() {
                data.vacancy_id = id;
            }
            data
        }
        (None, Some(id)) => state.profiles.vacancy(id).await?,
        (None, None) => {
            return Err(AppError::Validation(
                "either vacancy_data or vacancy_id is required".to_string(),
            ))
        }
    };
    let profile = state.profiles.resume_profile(req.resume_id).await?;
    Ok(state
        .engine
        .evaluate(&profile, &vacancy, req.organization_id)
        .await?)
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let result = run_match(&state, req).await?;
    Ok(Json(MatchResponse::from(&result)))
}

/// POST /api/v1/match/unified
pub async fn handle_unified_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<UnifiedMatchResponse>, AppError> {
    let result = run_match(&state, req).await?;
    Ok(Json(UnifiedMatchResponse::from(&result)))
}

/// POST /api/v1/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<ComparisonRequest>,
) -> Result<Json<ComparisonMatrixData>, AppError> {
    Ok(Json(state.comparator.compare(req).await?))
}
