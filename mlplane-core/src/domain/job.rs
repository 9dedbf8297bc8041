//! Job domain types

use serde::{Deserialize, Serialize};

/// Status of a one-shot remote job
///
/// Serialized exactly as the platform spells it (`"InProgress"`, `"Completed"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithViolations,
    Failed,
    Stopping,
    Stopped,
}

impl JobStatus {
    /// Whether no further transition happens without explicit caller action
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::CompletedWithViolations
                | JobStatus::Failed
                | JobStatus::Stopped
        )
    }

    /// Whether the job produced artifacts that result accessors may read
    pub fn has_results(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithViolations
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::CompletedWithViolations => "CompletedWithViolations",
            JobStatus::Failed => "Failed",
            JobStatus::Stopping => "Stopping",
            JobStatus::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(JobStatus::Pending),
            "InProgress" => Ok(JobStatus::InProgress),
            "Completed" => Ok(JobStatus::Completed),
            "CompletedWithViolations" => Ok(JobStatus::CompletedWithViolations),
            "Failed" => Ok(JobStatus::Failed),
            "Stopping" => Ok(JobStatus::Stopping),
            "Stopped" => Ok(JobStatus::Stopped),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Kind of one-shot job, which decides the keys used in its description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    AutoMl,
    Processing,
}

impl JobKind {
    /// Description key holding the job name
    pub fn name_key(&self) -> &'static str {
        match self {
            JobKind::AutoMl => "AutoMLJobName",
            JobKind::Processing => "ProcessingJobName",
        }
    }

    /// Description key holding the job status
    pub fn status_key(&self) -> &'static str {
        match self {
            JobKind::AutoMl => "AutoMLJobStatus",
            JobKind::Processing => "ProcessingJobStatus",
        }
    }

    /// Operation suffix used by the control plane (`Describe<suffix>`, `Stop<suffix>`)
    pub fn operation_suffix(&self) -> &'static str {
        match self {
            JobKind::AutoMl => "AutoMLJob",
            JobKind::Processing => "ProcessingJob",
        }
    }

    /// Log stream group the platform writes this kind's container output to
    pub fn log_group(&self) -> &'static str {
        match self {
            JobKind::AutoMl => "/aws/sagemaker/AutoMLJobs",
            JobKind::Processing => "/aws/sagemaker/ProcessingJobs",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::AutoMl => write!(f, "AutoML job"),
            JobKind::Processing => write!(f, "processing job"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::CompletedWithViolations.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());

        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(!JobStatus::Stopping.is_terminal());
    }

    #[test]
    fn test_only_completed_statuses_have_results() {
        assert!(JobStatus::Completed.has_results());
        assert!(JobStatus::CompletedWithViolations.has_results());
        assert!(!JobStatus::Failed.has_results());
        assert!(!JobStatus::Stopped.has_results());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&JobStatus::CompletedWithViolations).unwrap();
        assert_eq!(json, "\"CompletedWithViolations\"");

        let parsed: JobStatus = serde_json::from_str("\"InProgress\"").unwrap();
        assert_eq!(parsed, JobStatus::InProgress);
        assert_eq!("Stopped".parse::<JobStatus>(), Ok(JobStatus::Stopped));
        assert!("Running".parse::<JobStatus>().is_err());
    }
}
