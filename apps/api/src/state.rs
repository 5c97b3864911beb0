use std::sync::Arc;

use crate::matching::comparator::Comparator;
use crate::matching::engine::MatchEngine;
use crate::matching::store::ProfileStore;
use crate::registry::feedback::FeedbackLog;
use crate::registry::model_registry::ModelRegistry;
use crate::skills::admin::SkillAdmin;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Resume profiles and vacancies supplied by the extraction service.
    pub profiles: Arc<dyn ProfileStore>,
    pub engine: Arc<MatchEngine>,
    pub comparator: Arc<Comparator>,
    /// Synonym/taxonomy writes; swaps the snapshot `engine` reads from.
    pub skill_admin: Arc<SkillAdmin>,
    pub registry: Arc<ModelRegistry>,
    pub feedback: Arc<FeedbackLog>,
}
