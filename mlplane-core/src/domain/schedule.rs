//! Monitoring schedule domain types
//!
//! A schedule and its executions are independent state machines: the schedule
//! status says whether executions are being triggered at all, while each
//! execution carries its own status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a monitoring schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    /// Configuration changes have not propagated yet
    Pending,
    Scheduled,
    Stopped,
    Failed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "Pending",
            ScheduleStatus::Scheduled => "Scheduled",
            ScheduleStatus::Stopped => "Stopped",
            ScheduleStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single schedule execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithViolations,
    Failed,
    Stopped,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::CompletedWithViolations
                | ExecutionStatus::Failed
                | ExecutionStatus::Stopped
        )
    }

    pub fn has_results(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::CompletedWithViolations
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::InProgress => "InProgress",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::CompletedWithViolations => "CompletedWithViolations",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Stopped => "Stopped",
        };
        write!(f, "{}", s)
    }
}

/// Execution summary as listed by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionSummary {
    pub monitoring_schedule_name: String,
    pub scheduled_time: DateTime<Utc>,
    pub monitoring_execution_status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_job_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// One run of a schedule, with its output location resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub schedule_name: String,
    pub processing_job_name: String,
    pub status: ExecutionStatus,
    pub scheduled_time: DateTime<Utc>,
    /// Storage URI the execution writes its reports to
    pub output: Option<String>,
    pub failure_reason: Option<String>,
}

/// Schedule summary as listed by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleSummary {
    pub monitoring_schedule_name: String,
    pub monitoring_schedule_status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
}
