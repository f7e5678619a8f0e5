//! Tile generation through external tools.

pub mod error;
pub mod vips;

pub use error::GeneratorError;
pub use vips::VipsTileGenerator;
