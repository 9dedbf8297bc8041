//! Monitoring schedule handle
//!
//! A schedule and its executions are separate state machines. The schedule
//! status only says whether executions are triggered; whether one ran, and
//! how it ended, is read from the last execution summary.

use tracing::{debug, info};

use mlplane_core::domain::description::Description;
use mlplane_core::domain::job::JobKind;
use mlplane_core::domain::schedule::{ExecutionRecord, ExecutionStatus, ScheduleStatus};
use mlplane_core::dto::monitoring::{MonitoringScheduleConfig, UpdateMonitoringScheduleRequest};

use crate::error::{ClientError, Result};
use crate::polling::{Poller, WaitOptions};
use crate::session::Session;

const STATUS_KEY: &str = "MonitoringScheduleStatus";
const LAST_EXECUTION_STATUS: &str = "LastMonitoringExecutionSummary.MonitoringExecutionStatus";
const PROCESSING_OUTPUT_URI: &str = "ProcessingOutputConfig.Outputs.0.S3Output.S3Uri";

/// Handle to a monitoring schedule
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    session: Session,
    name: String,
    last_description: Option<Description>,
}

impl ScheduleHandle {
    pub fn new(session: Session, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
            last_description: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_description(&self) -> Option<&Description> {
        self.last_description.as_ref()
    }

    /// Fetches the schedule's current description, replacing the cache
    pub async fn describe(&mut self) -> Result<Description> {
        let description = self
            .session
            .control()
            .describe_monitoring_schedule(&self.name)
            .await?;
        self.last_description = Some(description.clone());
        Ok(description)
    }

    /// Fetches the schedule status
    pub async fn status(&mut self) -> Result<ScheduleStatus> {
        let description = self.describe().await?;
        schedule_status(&description)
    }

    /// Fetches the status of the most recent execution
    ///
    /// `None` means no execution has started yet.
    pub async fn last_execution_status(&mut self) -> Result<Option<ExecutionStatus>> {
        let description = self.describe().await?;
        last_execution_status(&description)
    }

    /// Waits until a configuration change has propagated
    ///
    /// Returns the first description whose status is no longer `Pending`.
    pub async fn wait_for_schedule_update(&mut self, options: WaitOptions) -> Result<Description> {
        let mut poller = Poller::new(&self.name, self.session.config().poll_interval, options);

        loop {
            let description = self.describe().await?;
            let status = schedule_status(&description)?;
            if status != ScheduleStatus::Pending {
                info!(schedule = %self.name, %status, "Schedule settled");
                return Ok(description);
            }

            debug!(schedule = %self.name, "Schedule update still pending");
            poller.tick().await?;
        }
    }

    /// Waits until the most recent execution reaches a terminal status
    ///
    /// Keeps polling while no execution has started.
    pub async fn wait_for_execution(&mut self, options: WaitOptions) -> Result<Description> {
        let mut poller = Poller::new(&self.name, self.session.config().poll_interval, options);

        loop {
            let description = self.describe().await?;
            match last_execution_status(&description)? {
                Some(status) if status.is_terminal() => {
                    info!(schedule = %self.name, %status, "Execution finished");
                    return Ok(description);
                }
                status => debug!(schedule = %self.name, ?status, "Waiting for execution"),
            }

            poller.tick().await?;
        }
    }

    pub async fn start(&self) -> Result<()> {
        info!(schedule = %self.name, "Starting monitoring schedule");
        self.session
            .control()
            .start_monitoring_schedule(&self.name)
            .await
    }

    pub async fn stop(&self) -> Result<()> {
        info!(schedule = %self.name, "Stopping monitoring schedule");
        self.session
            .control()
            .stop_monitoring_schedule(&self.name)
            .await
    }

    pub async fn delete(&self) -> Result<()> {
        info!(schedule = %self.name, "Deleting monitoring schedule");
        self.session
            .control()
            .delete_monitoring_schedule(&self.name)
            .await
    }

    /// Replaces the schedule configuration
    pub async fn update(&self, config: MonitoringScheduleConfig) -> Result<()> {
        info!(schedule = %self.name, "Updating monitoring schedule");
        self.session
            .control()
            .update_monitoring_schedule(&UpdateMonitoringScheduleRequest {
                monitoring_schedule_name: self.name.clone(),
                monitoring_schedule_config: config,
            })
            .await
    }

    /// Lists the schedule's executions, oldest first
    ///
    /// Each execution's output location is resolved by describing the
    /// processing job that ran it.
    pub async fn list_executions(&self) -> Result<Vec<ExecutionRecord>> {
        let mut summaries = self
            .session
            .control()
            .list_monitoring_executions(&self.name)
            .await?;
        summaries.sort_by_key(|s| s.scheduled_time);

        let mut records = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let processing_job_name = summary
                .processing_job_arn
                .as_deref()
                .map(job_name_from_arn)
                .unwrap_or_default();

            let output = if processing_job_name.is_empty() {
                None
            } else {
                self.session
                    .control()
                    .describe_job(JobKind::Processing, &processing_job_name)
                    .await?
                    .str_at(PROCESSING_OUTPUT_URI)
                    .map(str::to_string)
            };

            records.push(ExecutionRecord {
                schedule_name: summary.monitoring_schedule_name,
                processing_job_name,
                status: summary.monitoring_execution_status,
                scheduled_time: summary.scheduled_time,
                output,
                failure_reason: summary.failure_reason,
            });
        }

        Ok(records)
    }
}

/// Reads the schedule status of a description
pub fn schedule_status(description: &Description) -> Result<ScheduleStatus> {
    match description.decode_at::<ScheduleStatus>(STATUS_KEY) {
        Some(Ok(status)) => Ok(status),
        Some(Err(e)) => Err(ClientError::ParseError(format!("Invalid {STATUS_KEY}: {e}"))),
        None => Err(ClientError::ParseError(format!(
            "Description is missing {STATUS_KEY}"
        ))),
    }
}

/// Reads the status of the most recent execution, if one exists
pub fn last_execution_status(description: &Description) -> Result<Option<ExecutionStatus>> {
    description
        .decode_at::<ExecutionStatus>(LAST_EXECUTION_STATUS)
        .transpose()
        .map_err(|e| ClientError::ParseError(format!("Invalid {LAST_EXECUTION_STATUS}: {e}")))
}

/// `arn:aws:sagemaker:us-west-2:1:processing-job/name` becomes `name`
fn job_name_from_arn(arn: &str) -> String {
    arn.rsplit('/').next().unwrap_or(arn).to_string()
}
