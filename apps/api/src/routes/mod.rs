pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::registry::handlers as registry;
use crate::skills::handlers as skills;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching
        .route("/api/v1/match", post(matching::handle_match))
        .route("/api/v1/match/unified", post(matching::handle_unified_match))
        .route("/api/v1/compare", post(matching::handle_compare))
        // Skill admin
        .route("/api/v1/admin/synonyms", post(skills::handle_add_synonym))
        .route("/api/v1/admin/taxonomy", post(skills::handle_add_taxonomy))
        .route("/api/v1/admin/skills/reload", post(skills::handle_reload))
        // Model registry
        .route(
            "/api/v1/models",
            get(registry::handle_list_models).post(registry::handle_create_model),
        )
        .route(
            "/api/v1/models/:id/activate",
            post(registry::handle_activate_model),
        )
        .route(
            "/api/v1/models/:id/deactivate",
            post(registry::handle_deactivate_model),
        )
        .route(
            "/api/v1/models/:id/accuracy",
            get(registry::handle_model_accuracy),
        )
        // Feedback
        .route("/api/v1/feedback", post(registry::handle_record_feedback))
        .route(
            "/api/v1/feedback/process",
            post(registry::handle_process_feedback),
        )
        .route(
            "/api/v1/feedback/accuracy",
            get(registry::handle_global_accuracy),
        )
        .with_state(state)
}
