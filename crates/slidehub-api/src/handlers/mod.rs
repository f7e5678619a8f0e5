//! HTTP request handlers.

pub mod health;
pub mod jobs;
pub mod upload;

use validator::Validate;

use crate::error::ApiError;

/// Run `validator` rules and surface failures as a 400.
pub(crate) fn validate_request<T: Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|e| ApiError::validation(format!("Invalid request: {e}")))
}
