//! Built-in job implementations.

pub mod cleanup;
pub mod conversion;

pub use cleanup::SessionSweepJob;
pub use conversion::ConversionHandler;
