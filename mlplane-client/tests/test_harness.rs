//! In-memory platform used by the integration tests
//!
//! [`FakePlatform`] implements the control plane, blob storage and inference
//! runtime over one shared state. Jobs and endpoints walk through scripted
//! status sequences, every call is counted, and any operation can be made to
//! fail for one resource name.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mlplane_client::session::{BlobStore, ControlPlane, InferenceRuntime, InvokeRequest, InvokeResponse};
use mlplane_client::{ClientConfig, ClientError, Result, S3Uri, Session};
use mlplane_core::domain::candidate::Candidate;
use mlplane_core::domain::description::Description;
use mlplane_core::domain::job::{JobKind, JobStatus};
use mlplane_core::domain::log::{LogEntry, LogPage};
use mlplane_core::domain::schedule::{ExecutionStatus, ExecutionSummary, ScheduleStatus, ScheduleSummary};
use mlplane_core::dto::automl::{CreateAutoMlJobRequest, ListCandidatesRequest};
use mlplane_core::dto::endpoint::{CreateEndpointConfigRequest, CreateModelRequest, EndpointRequest};
use mlplane_core::dto::monitoring::{CreateMonitoringScheduleRequest, UpdateMonitoringScheduleRequest};
use mlplane_core::dto::processing::{CreateProcessingJobRequest, ListJobsFilter};

pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_REGION: &str = "us-west-2";
pub const TEST_ACCOUNT: &str = "123456789012";

/// Installs a test writer subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
struct FakeJob {
    kind: JobKind,
    description: Value,
    statuses: VecDeque<JobStatus>,
    logs: Vec<LogEntry>,
}

#[derive(Debug, Default)]
struct State {
    jobs: HashMap<String, FakeJob>,
    job_script: HashMap<JobKind, Vec<JobStatus>>,
    candidates: HashMap<String, Vec<Candidate>>,

    schedules: HashMap<String, Value>,
    executions: HashMap<String, Vec<ExecutionSummary>>,

    models: HashMap<String, Value>,
    endpoint_configs: HashMap<String, Value>,
    endpoints: HashMap<String, Value>,
    endpoint_statuses: HashMap<String, VecDeque<String>>,
    endpoint_script: Vec<String>,

    blobs: HashMap<String, Vec<u8>>,
    invocations: Vec<InvokeRequest>,
    invoke_response: Option<InvokeResponse>,

    failures: HashMap<(String, String), (u16, String)>,
    calls: HashMap<String, usize>,
    requests: Vec<(String, Value)>,
}

/// In-memory double of the three platform services
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<State>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session backed by this platform, polling every millisecond
    pub fn session(&self) -> Session {
        let mut config = ClientConfig::new("http://fake.invalid", TEST_REGION);
        config.default_bucket = Some(TEST_BUCKET.to_string());
        config.account_id = Some(TEST_ACCOUNT.to_string());
        config.poll_interval = Duration::from_millis(1);

        let shared = Arc::new(self.clone());
        Session::new(shared.clone(), shared.clone(), shared, config)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =============================================================================
    // Scripting
    // =============================================================================

    /// Statuses every newly created job of `kind` reports, one per describe
    ///
    /// The last status repeats once the sequence is exhausted. Jobs complete
    /// on their first describe when nothing is scripted.
    pub fn script_jobs(&self, kind: JobKind, statuses: &[JobStatus]) {
        self.lock().job_script.insert(kind, statuses.to_vec());
    }

    /// Registers a job that already exists on the platform
    pub fn add_job(&self, kind: JobKind, name: &str, description: Value, statuses: &[JobStatus]) {
        let mut description = description;
        description[kind.name_key()] = json!(name);
        self.lock().jobs.insert(
            name.to_string(),
            FakeJob {
                kind,
                description,
                statuses: statuses.iter().copied().collect(),
                logs: Vec::new(),
            },
        );
    }

    /// Merges top-level fields into a job's description
    pub fn patch_job(&self, name: &str, fields: Value) {
        let mut state = self.lock();
        if let (Some(job), Value::Object(fields)) = (state.jobs.get_mut(name), fields) {
            for (key, value) in fields {
                job.description[key] = value;
            }
        }
    }

    pub fn push_logs(&self, name: &str, messages: &[&str]) {
        let mut state = self.lock();
        if let Some(job) = state.jobs.get_mut(name) {
            for message in messages {
                job.logs.push(LogEntry {
                    timestamp: Utc::now(),
                    log_stream_name: format!("{name}/algo-1"),
                    message: message.to_string(),
                });
            }
        }
    }

    pub fn set_candidates(&self, job_name: &str, candidates: Vec<Candidate>) {
        self.lock()
            .candidates
            .insert(job_name.to_string(), candidates);
    }

    /// Statuses every endpoint reports after a create or update
    ///
    /// Defaults to `Creating` then `InService`.
    pub fn script_endpoints(&self, statuses: &[&str]) {
        self.lock().endpoint_script = statuses.iter().map(|s| s.to_string()).collect();
    }

    /// Registers an in-service endpoint backed by one config and `models`
    pub fn add_endpoint(&self, endpoint_name: &str, config_name: &str, models: &[&str]) {
        let variants: Vec<Value> = models
            .iter()
            .enumerate()
            .map(|(i, model)| {
                json!({
                    "VariantName": format!("variant-{i}"),
                    "ModelName": model,
                    "InitialInstanceCount": 1,
                    "InstanceType": "ml.m5.large",
                    "InitialVariantWeight": 1.0
                })
            })
            .collect();

        let mut state = self.lock();
        for model in models {
            state
                .models
                .insert(model.to_string(), json!({"ModelName": model}));
        }
        state.endpoint_configs.insert(
            config_name.to_string(),
            json!({"EndpointConfigName": config_name, "ProductionVariants": variants}),
        );
        state.endpoints.insert(
            endpoint_name.to_string(),
            json!({
                "EndpointName": endpoint_name,
                "EndpointConfigName": config_name,
                "EndpointStatus": "InService"
            }),
        );
    }

    /// Records a finished execution of `schedule_name`
    ///
    /// The processing job that ran it is registered with `output` as its
    /// output location.
    pub fn add_execution(
        &self,
        schedule_name: &str,
        job_name: &str,
        status: ExecutionStatus,
        output: Option<&str>,
    ) {
        let mut state = self.lock();
        let index = state
            .executions
            .get(schedule_name)
            .map(Vec::len)
            .unwrap_or_default();

        let summary = ExecutionSummary {
            monitoring_schedule_name: schedule_name.to_string(),
            scheduled_time: Utc::now() + ChronoDuration::hours(index as i64),
            monitoring_execution_status: status,
            processing_job_arn: Some(format!(
                "arn:aws:sagemaker:{TEST_REGION}:{TEST_ACCOUNT}:processing-job/{job_name}"
            )),
            endpoint_name: None,
            failure_reason: None,
        };

        let mut description = json!({
            "ProcessingJobName": job_name,
            "ProcessingJobStatus": "Completed"
        });
        if let Some(output) = output {
            description["ProcessingOutputConfig"] = json!({
                "Outputs": [{
                    "OutputName": "monitoring_output",
                    "S3Output": {
                        "S3Uri": output,
                        "LocalPath": "/opt/ml/processing/output",
                        "S3UploadMode": "Continuous"
                    }
                }]
            });
        }
        state.jobs.insert(
            job_name.to_string(),
            FakeJob {
                kind: JobKind::Processing,
                description,
                statuses: VecDeque::from([JobStatus::Completed]),
                logs: Vec::new(),
            },
        );

        if let Some(schedule) = state.schedules.get_mut(schedule_name) {
            schedule["LastMonitoringExecutionSummary"] = json!(summary);
        }
        state
            .executions
            .entry(schedule_name.to_string())
            .or_default()
            .push(summary);
    }

    pub fn put_blob(&self, uri: &str, body: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(uri.to_string(), body.into());
    }

    pub fn blob(&self, uri: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(uri).cloned()
    }

    pub fn blob_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.lock().blobs.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Response every invocation returns; the request body is echoed otherwise
    pub fn set_invoke_response(&self, body: impl Into<Vec<u8>>, content_type: &str) {
        self.lock().invoke_response = Some(InvokeResponse {
            body: body.into(),
            content_type: Some(content_type.to_string()),
        });
    }

    /// Makes `operation` fail for the resource called `name`
    pub fn fail(&self, operation: &str, name: &str, status: u16, message: &str) {
        self.lock().failures.insert(
            (operation.to_string(), name.to_string()),
            (status, message.to_string()),
        );
    }

    // =============================================================================
    // Inspection
    // =============================================================================

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or_default()
    }

    /// Request bodies sent to `operation`, oldest first
    pub fn requests(&self, operation: &str) -> Vec<Value> {
        self.lock()
            .requests
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn invocations(&self) -> Vec<InvokeRequest> {
        self.lock().invocations.clone()
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.lock().models.contains_key(name)
    }

    pub fn has_endpoint_config(&self, name: &str) -> bool {
        self.lock().endpoint_configs.contains_key(name)
    }

    pub fn has_endpoint(&self, name: &str) -> bool {
        self.lock().endpoints.contains_key(name)
    }

    pub fn has_schedule(&self, name: &str) -> bool {
        self.lock().schedules.contains_key(name)
    }

    pub fn job_names(&self, kind: JobKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .jobs
            .iter()
            .filter(|(_, job)| job.kind == kind)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    // =============================================================================
    // Internals
    // =============================================================================

    /// Counts the call and applies any injected failure
    fn enter(&self, operation: &str, name: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(operation.to_string()).or_default() += 1;
        if let Some((status, message)) = state
            .failures
            .get(&(operation.to_string(), name.to_string()))
        {
            return Err(ClientError::api_error(*status, message.clone()));
        }
        Ok(state)
    }

    fn record<T: Serialize>(state: &mut State, operation: &str, body: &T) -> Value {
        let value = serde_json::to_value(body).unwrap_or(Value::Null);
        state.requests.push((operation.to_string(), value.clone()));
        value
    }

    fn create_job(&self, operation: &str, kind: JobKind, name: &str, request: Value) -> Result<()> {
        let mut state = self.enter(operation, name)?;
        state.requests.push((operation.to_string(), request.clone()));
        if state.jobs.contains_key(name) {
            return Err(ClientError::api_error(400, format!("Job {name} already exists")));
        }

        let statuses = state
            .job_script
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| vec![JobStatus::Completed]);
        state.jobs.insert(
            name.to_string(),
            FakeJob {
                kind,
                description: request,
                statuses: statuses.into_iter().collect(),
                logs: Vec::new(),
            },
        );
        Ok(())
    }

    fn new_endpoint_statuses(state: &State) -> VecDeque<String> {
        if state.endpoint_script.is_empty() {
            VecDeque::from(["Creating".to_string(), "InService".to_string()])
        } else {
            state.endpoint_script.iter().cloned().collect()
        }
    }
}

fn not_found(kind: &str, name: &str) -> ClientError {
    ClientError::NotFound(format!("{kind} {name} does not exist"))
}

fn description(value: Value) -> Result<Description> {
    Description::from_value(value)
        .ok_or_else(|| ClientError::ParseError("description is not an object".to_string()))
}

fn schedule_endpoint(schedule: &Value) -> Option<&str> {
    schedule
        .pointer("/MonitoringScheduleConfig/MonitoringJobDefinition/MonitoringInputs/0/EndpointInput/EndpointName")
        .and_then(Value::as_str)
}

#[async_trait]
impl ControlPlane for FakePlatform {
    async fn create_auto_ml_job(&self, req: &CreateAutoMlJobRequest) -> Result<()> {
        let request = serde_json::to_value(req).unwrap_or(Value::Null);
        self.create_job("CreateAutoMLJob", JobKind::AutoMl, &req.job_name, request)
    }

    async fn create_processing_job(&self, req: &CreateProcessingJobRequest) -> Result<()> {
        let request = serde_json::to_value(req).unwrap_or(Value::Null);
        self.create_job(
            "CreateProcessingJob",
            JobKind::Processing,
            &req.processing_job_name,
            request,
        )
    }

    async fn describe_job(&self, kind: JobKind, name: &str) -> Result<Description> {
        let mut state = self.enter("DescribeJob", name)?;
        let job = state
            .jobs
            .get_mut(name)
            .filter(|job| job.kind == kind)
            .ok_or_else(|| not_found("Job", name))?;

        let status = if job.statuses.len() > 1 {
            job.statuses.pop_front()
        } else {
            job.statuses.front().copied()
        };
        if let Some(status) = status {
            job.description[kind.status_key()] = json!(status.as_str());
        }
        description(job.description.clone())
    }

    async fn list_jobs(&self, kind: JobKind, filter: &ListJobsFilter) -> Result<Vec<Description>> {
        let state = self.enter("ListJobs", "")?;
        let mut jobs: Vec<Description> = state
            .jobs
            .iter()
            .filter(|(name, job)| {
                job.kind == kind
                    && filter
                        .name_contains
                        .as_deref()
                        .is_none_or(|needle| name.contains(needle))
            })
            .filter_map(|(_, job)| Description::from_value(job.description.clone()))
            .collect();
        if let Some(max) = filter.max_results {
            jobs.truncate(max as usize);
        }
        Ok(jobs)
    }

    async fn stop_job(&self, kind: JobKind, name: &str) -> Result<()> {
        let mut state = self.enter("StopJob", name)?;
        let job = state
            .jobs
            .get_mut(name)
            .filter(|job| job.kind == kind)
            .ok_or_else(|| not_found("Job", name))?;
        job.statuses = VecDeque::from([JobStatus::Stopping, JobStatus::Stopped]);
        Ok(())
    }

    async fn job_logs(&self, _kind: JobKind, name: &str, cursor: Option<&str>) -> Result<LogPage> {
        let state = self.enter("JobLogs", name)?;
        let logs = state
            .jobs
            .get(name)
            .map(|job| job.logs.clone())
            .unwrap_or_default();

        let start = cursor
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or_default()
            .min(logs.len());
        Ok(LogPage {
            events: logs[start..].to_vec(),
            next_token: Some(logs.len().to_string()),
        })
    }

    async fn list_candidates(&self, req: &ListCandidatesRequest) -> Result<Vec<Candidate>> {
        let mut state = self.enter("ListCandidates", &req.job_name)?;
        Self::record(&mut state, "ListCandidates", req);
        let candidates = state
            .candidates
            .get(&req.job_name)
            .cloned()
            .unwrap_or_default();

        Ok(candidates
            .into_iter()
            .filter(|c| {
                req.status_equals
                    .as_deref()
                    .is_none_or(|s| c.candidate_status.as_deref() == Some(s))
                    && req
                        .candidate_name_equals
                        .as_deref()
                        .is_none_or(|n| c.candidate_name == n)
            })
            .take(req.max_results.map(|m| m as usize).unwrap_or(usize::MAX))
            .collect())
    }

    async fn create_monitoring_schedule(&self, req: &CreateMonitoringScheduleRequest) -> Result<()> {
        let mut state = self.enter("CreateMonitoringSchedule", &req.monitoring_schedule_name)?;
        Self::record(&mut state, "CreateMonitoringSchedule", req);
        if state.schedules.contains_key(&req.monitoring_schedule_name) {
            return Err(ClientError::api_error(
                400,
                format!("Schedule {} already exists", req.monitoring_schedule_name),
            ));
        }

        state.schedules.insert(
            req.monitoring_schedule_name.clone(),
            json!({
                "MonitoringScheduleName": req.monitoring_schedule_name,
                "MonitoringScheduleStatus": ScheduleStatus::Scheduled,
                "MonitoringScheduleConfig": req.monitoring_schedule_config,
            }),
        );
        Ok(())
    }

    async fn update_monitoring_schedule(&self, req: &UpdateMonitoringScheduleRequest) -> Result<()> {
        let mut state = self.enter("UpdateMonitoringSchedule", &req.monitoring_schedule_name)?;
        Self::record(&mut state, "UpdateMonitoringSchedule", req);
        let schedule = state
            .schedules
            .get_mut(&req.monitoring_schedule_name)
            .ok_or_else(|| not_found("Schedule", &req.monitoring_schedule_name))?;
        schedule["MonitoringScheduleConfig"] = json!(req.monitoring_schedule_config);
        Ok(())
    }

    async fn describe_monitoring_schedule(&self, name: &str) -> Result<Description> {
        let state = self.enter("DescribeMonitoringSchedule", name)?;
        let schedule = state
            .schedules
            .get(name)
            .ok_or_else(|| not_found("Schedule", name))?;
        description(schedule.clone())
    }

    async fn list_monitoring_schedules(&self, endpoint_name: Option<&str>) -> Result<Vec<ScheduleSummary>> {
        let state = self.enter("ListMonitoringSchedules", endpoint_name.unwrap_or_default())?;
        let mut summaries: Vec<ScheduleSummary> = state
            .schedules
            .values()
            .filter(|schedule| endpoint_name.is_none_or(|e| schedule_endpoint(schedule) == Some(e)))
            .filter_map(|schedule| {
                Some(ScheduleSummary {
                    monitoring_schedule_name: schedule["MonitoringScheduleName"].as_str()?.to_string(),
                    monitoring_schedule_status: serde_json::from_value(
                        schedule["MonitoringScheduleStatus"].clone(),
                    )
                    .ok()?,
                    endpoint_name: schedule_endpoint(schedule).map(str::to_string),
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.monitoring_schedule_name.cmp(&b.monitoring_schedule_name));
        Ok(summaries)
    }

    async fn start_monitoring_schedule(&self, name: &str) -> Result<()> {
        let mut state = self.enter("StartMonitoringSchedule", name)?;
        let schedule = state
            .schedules
            .get_mut(name)
            .ok_or_else(|| not_found("Schedule", name))?;
        schedule["MonitoringScheduleStatus"] = json!(ScheduleStatus::Scheduled);
        Ok(())
    }

    async fn stop_monitoring_schedule(&self, name: &str) -> Result<()> {
        let mut state = self.enter("StopMonitoringSchedule", name)?;
        let schedule = state
            .schedules
            .get_mut(name)
            .ok_or_else(|| not_found("Schedule", name))?;
        schedule["MonitoringScheduleStatus"] = json!(ScheduleStatus::Stopped);
        Ok(())
    }

    async fn delete_monitoring_schedule(&self, name: &str) -> Result<()> {
        let mut state = self.enter("DeleteMonitoringSchedule", name)?;
        state
            .schedules
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("Schedule", name))
    }

    async fn list_monitoring_executions(&self, schedule_name: &str) -> Result<Vec<ExecutionSummary>> {
        let state = self.enter("ListMonitoringExecutions", schedule_name)?;
        let mut executions = state
            .executions
            .get(schedule_name)
            .cloned()
            .unwrap_or_default();
        executions.reverse();
        Ok(executions)
    }

    async fn create_model(&self, req: &CreateModelRequest) -> Result<()> {
        let mut state = self.enter("CreateModel", &req.model_name)?;
        let body = Self::record(&mut state, "CreateModel", req);
        state.models.insert(req.model_name.clone(), body);
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let mut state = self.enter("DeleteModel", name)?;
        state
            .models
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("Model", name))
    }

    async fn create_endpoint_config(&self, req: &CreateEndpointConfigRequest) -> Result<()> {
        let mut state = self.enter("CreateEndpointConfig", &req.endpoint_config_name)?;
        let body = Self::record(&mut state, "CreateEndpointConfig", req);
        state
            .endpoint_configs
            .insert(req.endpoint_config_name.clone(), body);
        Ok(())
    }

    async fn describe_endpoint_config(&self, name: &str) -> Result<Description> {
        let state = self.enter("DescribeEndpointConfig", name)?;
        let config = state
            .endpoint_configs
            .get(name)
            .ok_or_else(|| not_found("Endpoint config", name))?;
        description(config.clone())
    }

    async fn delete_endpoint_config(&self, name: &str) -> Result<()> {
        let mut state = self.enter("DeleteEndpointConfig", name)?;
        state
            .endpoint_configs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("Endpoint config", name))
    }

    async fn create_endpoint(&self, req: &EndpointRequest) -> Result<()> {
        let mut state = self.enter("CreateEndpoint", &req.endpoint_name)?;
        Self::record(&mut state, "CreateEndpoint", req);
        let statuses = Self::new_endpoint_statuses(&state);
        state.endpoints.insert(
            req.endpoint_name.clone(),
            json!({
                "EndpointName": req.endpoint_name,
                "EndpointConfigName": req.endpoint_config_name,
            }),
        );
        state
            .endpoint_statuses
            .insert(req.endpoint_name.clone(), statuses);
        Ok(())
    }

    async fn update_endpoint(&self, req: &EndpointRequest) -> Result<()> {
        let mut state = self.enter("UpdateEndpoint", &req.endpoint_name)?;
        Self::record(&mut state, "UpdateEndpoint", req);
        let mut statuses = Self::new_endpoint_statuses(&state);
        if statuses.front().map(String::as_str) == Some("Creating") {
            statuses[0] = "Updating".to_string();
        }
        let endpoint = state
            .endpoints
            .get_mut(&req.endpoint_name)
            .ok_or_else(|| not_found("Endpoint", &req.endpoint_name))?;
        endpoint["EndpointConfigName"] = json!(req.endpoint_config_name);
        state
            .endpoint_statuses
            .insert(req.endpoint_name.clone(), statuses);
        Ok(())
    }

    async fn describe_endpoint(&self, name: &str) -> Result<Description> {
        let mut state = self.enter("DescribeEndpoint", name)?;
        let status = state.endpoint_statuses.get_mut(name).and_then(|statuses| {
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            }
        });
        let endpoint = state
            .endpoints
            .get_mut(name)
            .ok_or_else(|| not_found("Endpoint", name))?;
        if let Some(status) = status {
            endpoint["EndpointStatus"] = json!(status);
            if status == "Failed" {
                endpoint["FailureReason"] = json!("Model container failed its health check");
            }
        }
        description(endpoint.clone())
    }

    async fn delete_endpoint(&self, name: &str) -> Result<()> {
        let mut state = self.enter("DeleteEndpoint", name)?;
        state.endpoint_statuses.remove(name);
        state
            .endpoints
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("Endpoint", name))
    }
}

#[async_trait]
impl BlobStore for FakePlatform {
    async fn put_object(&self, uri: &S3Uri, body: Vec<u8>) -> Result<()> {
        let key = uri.to_string();
        let mut state = self.enter("PutObject", &key)?;
        state.blobs.insert(key, body);
        Ok(())
    }

    async fn get_object(&self, uri: &S3Uri) -> Result<Vec<u8>> {
        let key = uri.to_string();
        let state = self.enter("GetObject", &key)?;
        state
            .blobs
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("Object", &key))
    }
}

#[async_trait]
impl InferenceRuntime for FakePlatform {
    async fn invoke_endpoint(&self, req: &InvokeRequest) -> Result<InvokeResponse> {
        let mut state = self.enter("InvokeEndpoint", &req.endpoint_name)?;
        if !state.endpoints.contains_key(&req.endpoint_name) {
            return Err(not_found("Endpoint", &req.endpoint_name));
        }
        state.invocations.push(req.clone());

        Ok(state.invoke_response.clone().unwrap_or_else(|| InvokeResponse {
            body: req.body.clone(),
            content_type: req.accept.clone(),
        }))
    }
}
