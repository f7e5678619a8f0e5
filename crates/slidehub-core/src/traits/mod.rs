//! Core traits defined in `slidehub-core` and implemented by other crates.

pub mod generator;
pub mod object_store;

pub use generator::{GeneratedOutput, TileGenerator};
pub use object_store::{MultipartOptions, ObjectStore};
