//! Control-plane operations over HTTP

use async_trait::async_trait;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use mlplane_core::domain::candidate::Candidate;
use mlplane_core::domain::description::Description;
use mlplane_core::domain::job::JobKind;
use mlplane_core::domain::log::{LogEntry, LogPage};
use mlplane_core::domain::schedule::{ExecutionSummary, ScheduleSummary};
use mlplane_core::dto::automl::{CreateAutoMlJobRequest, ListCandidatesRequest};
use mlplane_core::dto::endpoint::{CreateEndpointConfigRequest, CreateModelRequest, EndpointRequest};
use mlplane_core::dto::monitoring::{
    CreateMonitoringScheduleRequest, UpdateMonitoringScheduleRequest,
};
use mlplane_core::dto::processing::{CreateProcessingJobRequest, ListJobsFilter};

use super::PlatformClient;
use crate::error::{ClientError, Result};
use crate::session::ControlPlane;

const LOGS_TARGET: &str = "Logs_20140328.FilterLogEvents";

impl PlatformClient {
    /// Collects every page of a list operation
    ///
    /// # Arguments
    /// * `operation` - Control-plane operation name
    /// * `body` - Request body; `NextToken` is added for follow-up pages
    /// * `key` - Response key holding the items
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        mut body: Map<String, Value>,
        key: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();

        loop {
            let mut page: Map<String, Value> = self.call(operation, &body).await?;

            if let Some(Value::Array(values)) = page.remove(key) {
                for value in values {
                    items.push(serde_json::from_value(value).map_err(|e| {
                        ClientError::ParseError(format!("Invalid entry in {key}: {e}"))
                    })?);
                }
            }

            match page.remove("NextToken") {
                Some(Value::String(token)) if !token.is_empty() => {
                    body.insert("NextToken".to_string(), Value::String(token));
                }
                _ => return Ok(items),
            }
        }
    }

    async fn describe(&self, operation: &str, key: &str, name: &str) -> Result<Description> {
        let value: Value = self.call(operation, &json!({ key: name })).await?;
        Description::from_value(value)
            .ok_or_else(|| ClientError::ParseError(format!("{operation} did not return an object")))
    }
}

fn to_map<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ClientError::InternalError(format!(
            "Failed to encode request: {e}"
        ))),
    }
}

// =============================================================================
// Job Logs
// =============================================================================

/// Position in a job's log output
///
/// Encoded as `token:<next token>` while the log service hands out tokens
/// and as `after:<epoch millis>` once it stops doing so.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogCursor {
    Token(String),
    After(i64),
}

impl LogCursor {
    fn parse(cursor: &str) -> Option<Self> {
        if let Some(token) = cursor.strip_prefix("token:") {
            return Some(Self::Token(token.to_string()));
        }
        cursor
            .strip_prefix("after:")
            .and_then(|ms| ms.parse().ok())
            .map(Self::After)
    }

    fn encode(&self) -> String {
        match self {
            Self::Token(token) => format!("token:{token}"),
            Self::After(ms) => format!("after:{ms}"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsResponse {
    #[serde(default)]
    events: Vec<FilteredLogEvent>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilteredLogEvent {
    timestamp: i64,
    log_stream_name: String,
    message: String,
}

#[async_trait]
impl ControlPlane for PlatformClient {
    // =============================================================================
    // Jobs
    // =============================================================================

    async fn create_auto_ml_job(&self, req: &CreateAutoMlJobRequest) -> Result<()> {
        self.call_empty("CreateAutoMLJob", req).await
    }

    async fn create_processing_job(&self, req: &CreateProcessingJobRequest) -> Result<()> {
        self.call_empty("CreateProcessingJob", req).await
    }

    async fn describe_job(&self, kind: JobKind, name: &str) -> Result<Description> {
        let operation = format!("Describe{}", kind.operation_suffix());
        self.describe(&operation, kind.name_key(), name).await
    }

    async fn list_jobs(&self, kind: JobKind, filter: &ListJobsFilter) -> Result<Vec<Description>> {
        let suffix = kind.operation_suffix();
        let mut body = to_map(filter)?;
        body.insert("SortBy".to_string(), json!("CreationTime"));
        body.insert("SortOrder".to_string(), json!("Descending"));

        self.list_all(
            &format!("List{suffix}s"),
            body,
            &format!("{suffix}Summaries"),
        )
        .await
    }

    async fn stop_job(&self, kind: JobKind, name: &str) -> Result<()> {
        let operation = format!("Stop{}", kind.operation_suffix());
        self.call_empty(&operation, &json!({ kind.name_key(): name }))
            .await
    }

    async fn job_logs(&self, kind: JobKind, name: &str, cursor: Option<&str>) -> Result<LogPage> {
        let position = cursor.and_then(LogCursor::parse);
        let request = FilterLogEventsRequest {
            log_group_name: kind.log_group(),
            log_stream_name_prefix: name,
            next_token: match &position {
                Some(LogCursor::Token(token)) => Some(token.as_str()),
                _ => None,
            },
            start_time: match &position {
                Some(LogCursor::After(ms)) => Some(*ms),
                _ => None,
            },
        };

        let response: FilterLogEventsResponse = self.call_target(LOGS_TARGET, &request).await?;

        let next = match (&response.next_token, response.events.last()) {
            (Some(token), _) => Some(LogCursor::Token(token.clone())),
            (None, Some(last)) => Some(LogCursor::After(last.timestamp + 1)),
            (None, None) => position,
        };

        let events = response
            .events
            .into_iter()
            .map(|event| LogEntry {
                timestamp: DateTime::from_timestamp_millis(event.timestamp).unwrap_or_default(),
                log_stream_name: event.log_stream_name,
                message: event.message,
            })
            .collect();

        Ok(LogPage {
            events,
            next_token: next.map(|c| c.encode()),
        })
    }

    async fn list_candidates(&self, req: &ListCandidatesRequest) -> Result<Vec<Candidate>> {
        self.list_all("ListCandidatesForAutoMLJob", to_map(req)?, "Candidates")
            .await
    }

    // =============================================================================
    // Monitoring Schedules
    // =============================================================================

    async fn create_monitoring_schedule(
        &self,
        req: &CreateMonitoringScheduleRequest,
    ) -> Result<()> {
        self.call_empty("CreateMonitoringSchedule", req).await
    }

    async fn update_monitoring_schedule(
        &self,
        req: &UpdateMonitoringScheduleRequest,
    ) -> Result<()> {
        self.call_empty("UpdateMonitoringSchedule", req).await
    }

    async fn describe_monitoring_schedule(&self, name: &str) -> Result<Description> {
        self.describe("DescribeMonitoringSchedule", "MonitoringScheduleName", name)
            .await
    }

    async fn list_monitoring_schedules(
        &self,
        endpoint_name: Option<&str>,
    ) -> Result<Vec<ScheduleSummary>> {
        let mut body = Map::new();
        if let Some(endpoint_name) = endpoint_name {
            body.insert("EndpointName".to_string(), json!(endpoint_name));
        }

        self.list_all(
            "ListMonitoringSchedules",
            body,
            "MonitoringScheduleSummaries",
        )
        .await
    }

    async fn start_monitoring_schedule(&self, name: &str) -> Result<()> {
        self.call_empty(
            "StartMonitoringSchedule",
            &json!({ "MonitoringScheduleName": name }),
        )
        .await
    }

    async fn stop_monitoring_schedule(&self, name: &str) -> Result<()> {
        self.call_empty(
            "StopMonitoringSchedule",
            &json!({ "MonitoringScheduleName": name }),
        )
        .await
    }

    async fn delete_monitoring_schedule(&self, name: &str) -> Result<()> {
        self.call_empty(
            "DeleteMonitoringSchedule",
            &json!({ "MonitoringScheduleName": name }),
        )
        .await
    }

    async fn list_monitoring_executions(
        &self,
        schedule_name: &str,
    ) -> Result<Vec<ExecutionSummary>> {
        let body = to_map(&json!({
            "MonitoringScheduleName": schedule_name,
            "SortBy": "ScheduledTime",
            "SortOrder": "Ascending",
        }))?;

        self.list_all(
            "ListMonitoringExecutions",
            body,
            "MonitoringExecutionSummaries",
        )
        .await
    }

    // =============================================================================
    // Models and Endpoints
    // =============================================================================

    async fn create_model(&self, req: &CreateModelRequest) -> Result<()> {
        self.call_empty("CreateModel", req).await
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        self.call_empty("DeleteModel", &json!({ "ModelName": name }))
            .await
    }

    async fn create_endpoint_config(&self, req: &CreateEndpointConfigRequest) -> Result<()> {
        self.call_empty("CreateEndpointConfig", req).await
    }

    async fn describe_endpoint_config(&self, name: &str) -> Result<Description> {
        self.describe("DescribeEndpointConfig", "EndpointConfigName", name)
            .await
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        self.call_empty(
            "DeleteEndpointConfig",
            &json!({ "EndpointConfigName": name }),
        )
        .await
    }

    async fn create_endpoint(&self, req: &EndpointRequest) -> Result<()> {
        self.call_empty("CreateEndpoint", req).await
    }

    async fn update_endpoint(&self, req: &EndpointRequest) -> Result<()> {
        self.call_empty("UpdateEndpoint", req).await
    }

    async fn describe_endpoint(&self, name: &str) -> Result<Description> {
        self.describe("DescribeEndpoint", "EndpointName", name)
            .await
    }

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        self.call_empty("DeleteEndpoint", &json!({ "EndpointName": name }))
            .await
    }
}
