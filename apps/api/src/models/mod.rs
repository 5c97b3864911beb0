pub mod feedback;
pub mod model_version;
pub mod profile;
pub mod taxonomy;
