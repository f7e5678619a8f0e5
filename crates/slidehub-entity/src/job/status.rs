//! Job status enumeration and lifecycle rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a conversion job.
///
/// Jobs move forward only: `Pending -> Converting -> Uploading -> Completed`,
/// and any non-terminal state may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Reassembled and waiting for a pipeline slot.
    Pending,
    /// The tile generator is running.
    Converting,
    /// Generated files are being published.
    Uploading,
    /// Every file was published.
    Completed,
    /// A stage failed; see the job message.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position along the forward path; `Failed` sits outside it.
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Converting => 1,
            Self::Uploading => 2,
            Self::Completed => 3,
            Self::Failed => u8::MAX,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same non-terminal state is legal (progress updates).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            Self::Completed => *self == Self::Uploading,
            _ => next.rank() == self.rank() || next.rank() == self.rank() + 1,
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Converting => "converting",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_legal() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Converting));
        assert!(JobStatus::Converting.can_transition_to(JobStatus::Uploading));
        assert!(JobStatus::Uploading.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Uploading.can_transition_to(JobStatus::Uploading));
    }

    #[test]
    fn skipping_and_reversing_are_illegal() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Uploading));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Uploading.can_transition_to(JobStatus::Converting));
    }

    #[test]
    fn terminal_states_are_sticky() {
        for next in [
            JobStatus::Pending,
            JobStatus::Converting,
            JobStatus::Uploading,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Uploading).unwrap();
        assert_eq!(json, "\"uploading\"");
    }
}
