// Model version registry (active / experiment versions per model name) and
// recruiter feedback that feeds version accuracy.

pub mod feedback;
pub mod handlers;
pub mod model_registry;
pub mod store;
