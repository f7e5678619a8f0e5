//! Publisher failure reporting.

use std::collections::BTreeMap;
use std::fmt;

use slidehub_core::error::AppError;

/// Number of failed files kept verbatim in a [`PublishError::Failed`].
pub const MAX_FAILURE_SAMPLES: usize = 10;
/// Failure summaries are truncated to this many characters.
pub const MAX_SUMMARY_CHARS: usize = 100;

/// Errors returned by [`crate::Publisher::publish`].
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Some files could not be published after exhausting their retries.
    #[error("Failed to upload {failed} files out of {total}")]
    Failed {
        failed: u64,
        total: u64,
        /// Up to ten `(object key, summary)` pairs.
        samples: Vec<(String, String)>,
    },

    /// The run could not start (enumeration or store failure).
    #[error(transparent)]
    Setup(#[from] AppError),
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Failed { failed, total, .. } => AppError::publish_failed(format!(
                "{failed} of {total} files could not be published"
            )),
            PublishError::Setup(inner) => inner,
        }
    }
}

/// Coarse cause of a failed upload, used for the diagnostic histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureCategory {
    AccessDenied,
    Authentication,
    BucketNotFound,
    Network,
    Other,
}

impl FailureCategory {
    /// Classify an error by the provider codes in its message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if message.contains("AccessDenied") || lower.contains("http 403") {
            Self::AccessDenied
        } else if message.contains("InvalidAccessKeyId")
            || message.contains("SignatureDoesNotMatch")
            || lower.contains("credential")
        {
            Self::Authentication
        } else if message.contains("NoSuchBucket") {
            Self::BucketNotFound
        } else if lower.contains("network") || lower.contains("timeout") || lower.contains("timed out")
        {
            Self::Network
        } else {
            Self::Other
        }
    }

    /// Operator hint logged alongside the histogram.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::AccessDenied => "check bucket permissions and policy",
            Self::Authentication => "check access key and secret key",
            Self::BucketNotFound => "check bucket name and region",
            Self::Network => "check connectivity to the storage endpoint",
            Self::Other => "see sampled errors",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessDenied => "AccessDenied",
            Self::Authentication => "Authentication",
            Self::BucketNotFound => "BucketNotFound",
            Self::Network => "Network",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Collected failures of one publish run.
#[derive(Debug, Default)]
pub struct FailureLog {
    count: u64,
    samples: Vec<(String, String)>,
    categories: BTreeMap<FailureCategory, u64>,
}

impl FailureLog {
    pub fn record(&mut self, key: &str, err: &AppError) {
        self.count += 1;
        let message = err.to_string();
        *self
            .categories
            .entry(FailureCategory::classify(&message))
            .or_default() += 1;
        if self.samples.len() < MAX_FAILURE_SAMPLES {
            self.samples.push((key.to_string(), truncate(&message)));
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn categories(&self) -> &BTreeMap<FailureCategory, u64> {
        &self.categories
    }

    /// Log the histogram and samples, then convert into an error.
    pub fn into_error(self, job_id: &str, total: u64) -> PublishError {
        for (category, count) in &self.categories {
            tracing::error!(
                job_id,
                category = %category,
                count,
                hint = category.hint(),
                "Upload failures by category"
            );
        }
        for (key, summary) in &self.samples {
            tracing::error!(job_id, key = %key, error = %summary, "Upload failed");
        }
        if self.count > self.samples.len() as u64 {
            tracing::error!(
                job_id,
                more = self.count - self.samples.len() as u64,
                "Further upload failures omitted"
            );
        }
        PublishError::Failed {
            failed: self.count,
            total,
            samples: self.samples,
        }
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_SUMMARY_CHARS {
        message.to_string()
    } else {
        let mut short: String = message.chars().take(MAX_SUMMARY_CHARS).collect();
        short.push_str("...");
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidehub_core::error::ErrorKind;

    #[test]
    fn test_classify() {
        use FailureCategory::*;
        assert_eq!(FailureCategory::classify("S3 put_object failed: AccessDenied"), AccessDenied);
        assert_eq!(FailureCategory::classify("InvalidAccessKeyId: bad"), Authentication);
        assert_eq!(FailureCategory::classify("NoSuchBucket"), BucketNotFound);
        assert_eq!(FailureCategory::classify("PUT 'k' timed out: network error"), Network);
        assert_eq!(FailureCategory::classify("disk on fire"), Other);
    }

    #[test]
    fn test_samples_are_bounded() {
        let mut log = FailureLog::default();
        let long = "x".repeat(500);
        for i in 0..25 {
            log.record(&format!("k{i}"), &AppError::external_service(long.clone()));
        }
        assert_eq!(log.count(), 25);
        assert_eq!(log.categories()[&FailureCategory::Other], 25);

        match log.into_error("job", 100) {
            PublishError::Failed { failed, total, samples } => {
                assert_eq!((failed, total), (25, 100));
                assert_eq!(samples.len(), MAX_FAILURE_SAMPLES);
                assert!(samples[0].1.chars().count() <= MAX_SUMMARY_CHARS + 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_into_app_error() {
        let err: AppError = PublishError::Failed {
            failed: 3,
            total: 40,
            samples: vec![],
        }
        .into();
        assert_eq!(err.kind, ErrorKind::PublishFailed);
        assert_eq!(err.message, "3 of 40 files could not be published");
    }
}
