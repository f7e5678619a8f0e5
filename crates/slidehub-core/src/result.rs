//! Convenience result type alias for SlideHub.

use crate::error::AppError;

/// A specialized `Result` type for SlideHub operations.
pub type AppResult<T> = Result<T, AppError>;
