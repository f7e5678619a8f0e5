//! # slidehub-service
//!
//! Business logic for SlideHub. The [`JobRegistry`] tracks conversion jobs,
//! the [`Publisher`] uploads generated pyramids with bounded concurrency,
//! the converter wraps the external tile generator, and the
//! [`Orchestrator`] drives an upload from reassembly to publication.

pub mod converter;
pub mod pipeline;
pub mod publisher;
pub mod registry;

pub use pipeline::{Orchestrator, PipelineDispatcher, PipelineTask, Submission};
pub use publisher::{PublishReport, Publisher};
pub use registry::{JobRegistry, UpdateOutcome};
