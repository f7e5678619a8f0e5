//! Publish descriptors shared between the orchestrator and the publisher.

pub mod options;
pub mod task;

pub use options::PublishOptions;
pub use task::{PublishTask, content_type_for};
