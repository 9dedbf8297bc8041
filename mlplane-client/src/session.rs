//! Remote session facade
//!
//! The platform is reached through three traits so that every component can
//! be driven by the HTTP transport in production and by an in-memory double
//! in tests. A [`Session`] bundles one implementation of each with the client
//! configuration and is passed explicitly to everything that talks to the
//! platform.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use mlplane_core::domain::candidate::Candidate;
use mlplane_core::domain::description::Description;
use mlplane_core::domain::job::JobKind;
use mlplane_core::domain::log::LogPage;
use mlplane_core::domain::schedule::{ExecutionSummary, ScheduleSummary};
use mlplane_core::dto::automl::{CreateAutoMlJobRequest, ListCandidatesRequest};
use mlplane_core::dto::endpoint::{CreateEndpointConfigRequest, CreateModelRequest, EndpointRequest};
use mlplane_core::dto::monitoring::{
    CreateMonitoringScheduleRequest, UpdateMonitoringScheduleRequest,
};
use mlplane_core::dto::processing::{CreateProcessingJobRequest, ListJobsFilter};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::PlatformClient;
use crate::s3::S3Uri;

/// Control-plane operations
#[async_trait]
pub trait ControlPlane: Send + Sync {
    // =============================================================================
    // Jobs
    // =============================================================================

    async fn create_auto_ml_job(&self, req: &CreateAutoMlJobRequest) -> Result<()>;

    async fn create_processing_job(&self, req: &CreateProcessingJobRequest) -> Result<()>;

    /// Fetches the current description of a job
    async fn describe_job(&self, kind: JobKind, name: &str) -> Result<Description>;

    /// Lists job summaries of one kind, newest first
    async fn list_jobs(&self, kind: JobKind, filter: &ListJobsFilter) -> Result<Vec<Description>>;

    /// Requests a job stop; returns before the job actually stops
    async fn stop_job(&self, kind: JobKind, name: &str) -> Result<()>;

    /// Fetches log lines written after `cursor`
    ///
    /// # Arguments
    /// * `kind` - Kind of the job
    /// * `name` - Job name
    /// * `cursor` - The `next_token` of the previous page, `None` to start from the beginning
    ///
    /// # Returns
    /// New lines plus the cursor to continue from
    async fn job_logs(&self, kind: JobKind, name: &str, cursor: Option<&str>) -> Result<LogPage>;

    async fn list_candidates(&self, req: &ListCandidatesRequest) -> Result<Vec<Candidate>>;

    // =============================================================================
    // Monitoring Schedules
    // =============================================================================

    async fn create_monitoring_schedule(
        &self,
        req: &CreateMonitoringScheduleRequest,
    ) -> Result<()>;

    async fn update_monitoring_schedule(
        &self,
        req: &UpdateMonitoringScheduleRequest,
    ) -> Result<()>;

    async fn describe_monitoring_schedule(&self, name: &str) -> Result<Description>;

    /// Lists schedules, optionally only those attached to one endpoint
    async fn list_monitoring_schedules(
        &self,
        endpoint_name: Option<&str>,
    ) -> Result<Vec<ScheduleSummary>>;

    async fn start_monitoring_schedule(&self, name: &str) -> Result<()>;

    async fn stop_monitoring_schedule(&self, name: &str) -> Result<()>;

    async fn delete_monitoring_schedule(&self, name: &str) -> Result<()>;

    /// Lists the executions of a schedule, oldest first
    async fn list_monitoring_executions(
        &self,
        schedule_name: &str,
    ) -> Result<Vec<ExecutionSummary>>;

    // =============================================================================
    // Models and Endpoints
    // =============================================================================

    async fn create_model(&self, req: &CreateModelRequest) -> Result<()>;

    async fn delete_model(&self, name: &str) -> Result<()>;

    async fn create_endpoint_config(&self, req: &CreateEndpointConfigRequest) -> Result<()>;

    async fn describe_endpoint_config(&self, name: &str) -> Result<Description>;

    async fn delete_endpoint_config(&self, name: &str) -> Result<()>;

    async fn create_endpoint(&self, req: &EndpointRequest) -> Result<()>;

    /// Points an existing endpoint at another endpoint configuration
    async fn update_endpoint(&self, req: &EndpointRequest) -> Result<()>;

    async fn describe_endpoint(&self, name: &str) -> Result<Description>;

    async fn delete_endpoint(&self, name: &str) -> Result<()>;
}

/// Blob storage operations
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, uri: &S3Uri, body: Vec<u8>) -> Result<()>;

    /// Reads a whole object; a missing object is a not-found error
    async fn get_object(&self, uri: &S3Uri) -> Result<Vec<u8>>;
}

/// One inference call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub endpoint_name: String,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Inference runtime operations
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    async fn invoke_endpoint(&self, req: &InvokeRequest) -> Result<InvokeResponse>;
}

/// Explicit bundle of platform collaborators and configuration
#[derive(Clone)]
pub struct Session {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn BlobStore>,
    runtime: Arc<dyn InferenceRuntime>,
    config: ClientConfig,
}

impl Session {
    /// Creates a session from explicit collaborators
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn BlobStore>,
        runtime: Arc<dyn InferenceRuntime>,
        config: ClientConfig,
    ) -> Self {
        Self {
            control,
            storage,
            runtime,
            config,
        }
    }

    /// Creates a session backed by the HTTP transport
    ///
    /// # Arguments
    /// * `config` - Validated before any client is built
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(PlatformClient::new(&config)?);
        Ok(Self::new(client.clone(), client.clone(), client, config))
    }

    pub fn control(&self) -> &dyn ControlPlane {
        self.control.as_ref()
    }

    pub fn storage(&self) -> &dyn BlobStore {
        self.storage.as_ref()
    }

    pub fn runtime(&self) -> &dyn InferenceRuntime {
        self.runtime.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn default_bucket(&self) -> String {
        self.config.default_bucket()
    }

    /// Turns a bare role name into a role ARN
    ///
    /// Values that already contain a `/` are returned unchanged.
    pub fn expand_role(&self, role: &str) -> String {
        if role.contains('/') {
            return role.to_string();
        }
        format!(
            "arn:aws:iam::{}:role/{}",
            self.config.account_id.as_deref().unwrap_or("000000000000"),
            role
        )
    }

    // =============================================================================
    // Storage Helpers
    // =============================================================================

    /// Uploads a local file or directory
    ///
    /// # Arguments
    /// * `path` - Local file or directory
    /// * `bucket` - Target bucket, the default bucket when `None`
    /// * `key_prefix` - Key prefix objects are written under
    ///
    /// # Returns
    /// `s3://bucket/prefix/<file name>` for a file, `s3://bucket/prefix` for a directory
    pub async fn upload_data(
        &self,
        path: impl AsRef<Path>,
        bucket: Option<&str>,
        key_prefix: &str,
    ) -> Result<String> {
        let path = path.as_ref();
        let bucket = bucket
            .map(str::to_string)
            .unwrap_or_else(|| self.default_bucket());
        let prefix = S3Uri::new(bucket, key_prefix);

        let metadata = tokio::fs::metadata(path).await?;
        if metadata.is_file() {
            let file_name = file_name(path)?;
            let target = prefix.join(&file_name);
            self.upload_file(path, &target).await?;
            return Ok(target.to_string());
        }

        for file in walk_files(path).await? {
            let relative = file
                .strip_prefix(path)
                .map_err(|e| ClientError::InternalError(e.to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            self.upload_file(&file, &prefix.join(&key)).await?;
        }

        Ok(prefix.to_string())
    }

    /// Writes a string body to `uri`
    pub async fn upload_string(&self, body: &str, uri: &str) -> Result<String> {
        let target = S3Uri::parse(uri)?;
        self.storage
            .put_object(&target, body.as_bytes().to_vec())
            .await?;
        debug!(uri = %target, bytes = body.len(), "Uploaded string body");
        Ok(target.to_string())
    }

    /// Reads the object at `uri` as UTF-8 text
    pub async fn read_string(&self, uri: &str) -> Result<String> {
        let source = S3Uri::parse(uri)?;
        let bytes = self.storage.get_object(&source).await?;
        String::from_utf8(bytes)
            .map_err(|e| ClientError::ParseError(format!("Object {source} is not UTF-8: {e}")))
    }

    async fn upload_file(&self, path: &Path, target: &S3Uri) -> Result<()> {
        let body = tokio::fs::read(path).await?;
        info!(path = %path.display(), uri = %target, "Uploading file");
        self.storage.put_object(target, body).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ClientError::validation(format!("{} has no file name", path.display())))
}

async fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let files = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| ClientError::InternalError(format!("Directory walk panicked: {e}")))??;

    Ok(files)
}
