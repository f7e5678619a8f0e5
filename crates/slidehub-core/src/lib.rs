//! # slidehub-core
//!
//! Core crate for SlideHub. Contains the configuration schemas, the
//! object-store and tile-generator traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SlideHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod retry;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
