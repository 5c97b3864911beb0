use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::FeedbackEntry;
use crate::models::model_version::ModelVersion;
use crate::registry::feedback::{AccuracyReport, NewFeedback, ProcessSummary};
use crate::registry::model_registry::NewModelVersion;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ModelListQuery {
    pub model_name: Option<String>,
}

/// GET /api/v1/models
pub async fn handle_list_models(
    State(state): State<AppState>,
    Query(params): Query<ModelListQuery>,
) -> Result<Json<Vec<ModelVersion>>, AppError> {
    let versions = state.registry.list(params.model_name.as_deref()).await?;
    Ok(Json(versions))
}

/// POST /api/v1/models
pub async fn handle_create_model(
    State(state): State<AppState>,
    Json(req): Json<NewModelVersion>,
) -> Result<(StatusCode, Json<ModelVersion>), AppError> {
    let version = state.registry.create(req).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// POST /api/v1/models/:id/activate
pub async fn handle_activate_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModelVersion>, AppError> {
    Ok(Json(state.registry.activate(id).await?))
}

/// POST /api/v1/models/:id/deactivate
pub async fn handle_deactivate_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModelVersion>, AppError> {
    Ok(Json(state.registry.deactivate(id).await?))
}

/// GET /api/v1/models/:id/accuracy
pub async fn handle_model_accuracy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccuracyReport>, AppError> {
    state.registry.get(id).await?;
    Ok(Json(state.feedback.accuracy(Some(id)).await?))
}

/// POST /api/v1/feedback
pub async fn handle_record_feedback(
    State(state): State<AppState>,
    Json(req): Json<NewFeedback>,
) -> Result<(StatusCode, Json<FeedbackEntry>), AppError> {
    let entry = state.feedback.record(req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/v1/feedback/process
pub async fn handle_process_feedback(
    State(state): State<AppState>,
) -> Result<Json<ProcessSummary>, AppError> {
    Ok(Json(state.feedback.process_pending().await?))
}

/// GET /api/v1/feedback/accuracy
pub async fn handle_global_accuracy(
    State(state): State<AppState>,
) -> Result<Json<AccuracyReport>, AppError> {
    Ok(Json(state.feedback.accuracy(None).await?))
}
