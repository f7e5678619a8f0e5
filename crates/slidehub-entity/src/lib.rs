//! # slidehub-entity
//!
//! Domain models for SlideHub: upload sessions and their receipts,
//! conversion jobs and their lifecycle, and publish descriptors. All
//! entities derive `Debug`, `Clone`, `Serialize`, and `Deserialize`.

pub mod job;
pub mod publish;
pub mod upload;
