//! Conversion job entities.

pub mod model;
pub mod status;

pub use model::Job;
pub use status::JobStatus;
