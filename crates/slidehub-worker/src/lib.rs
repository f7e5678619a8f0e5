//! Background pipeline processing and scheduled tasks for SlideHub.
//!
//! This crate provides:
//! - A bounded queue that the request path pushes pipeline tasks into
//! - A worker runner that executes queued pipelines with bounded concurrency
//! - Handlers for conversion pipelines and the session expiry sweep
//! - A cron scheduler for periodic maintenance

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use queue::{PipelineQueue, PipelineReceiver};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
