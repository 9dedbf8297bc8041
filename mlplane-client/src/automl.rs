//! AutoML jobs
//!
//! [`AutoMl`] validates its configuration, builds the `CreateAutoMLJob`
//! request, and gives access to the job's candidates once it has run.
//! Deploying a candidate creates a pipeline model made of the candidate's
//! inference containers, an endpoint configuration and an endpoint.

use tracing::{debug, info};

use mlplane_core::domain::candidate::Candidate;
use mlplane_core::domain::description::Description;
use mlplane_core::domain::endpoint::ProductionVariant;
use mlplane_core::domain::job::JobKind;
use mlplane_core::dto::automl::{
    AutoMlChannel, AutoMlDataSource, AutoMlJobConfig, AutoMlJobObjective, CandidateSortBy,
    CompletionCriteria, CreateAutoMlJobRequest, ListCandidatesRequest, OutputDataConfig,
    ProblemType, SecurityConfig, SortOrder,
};
use mlplane_core::dto::common::{S3DataSource, Tag, VpcConfig};
use mlplane_core::dto::endpoint::{
    ContainerDefinition, CreateEndpointConfigRequest, CreateModelRequest, EndpointRequest,
};

use crate::error::{ClientError, Result};
use crate::job::JobHandle;
use crate::naming::{base_name_from_image, name_from_base};
use crate::polling::WaitOptions;
use crate::predictor::{Predictor, wait_for_endpoint};
use crate::s3::is_s3_uri;
use crate::session::Session;

const DEFAULT_BASE_JOB_NAME: &str = "sagemaker-auto-ml";
/// CreateAutoMLJob rejects longer names
const MAX_JOB_NAME_LEN: usize = 32;
const DEFAULT_MAX_CANDIDATES: u32 = 500;
const INPUT_KEY_PREFIX: &str = "auto-ml-input-data";
const MAX_MODEL_NAME_LEN: usize = 63;

// ============================================================================
// Inputs
// ============================================================================

/// Explicit input channels with their own target column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoMlInput {
    /// `s3://` locations, one channel each
    pub inputs: Vec<String>,
    pub target_attribute_name: String,
    pub compression: Option<String>,
}

impl AutoMlInput {
    pub fn new(inputs: Vec<String>, target_attribute_name: impl Into<String>) -> Self {
        Self {
            inputs,
            target_attribute_name: target_attribute_name.into(),
            compression: None,
        }
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }
}

/// Training data accepted by [`AutoMl::fit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataInput {
    /// One `s3://` location or a local path that is uploaded first
    SingleLocation(String),
    /// Several `s3://` locations
    LocationList(Vec<String>),
    Structured(AutoMlInput),
}

impl From<&str> for DataInput {
    fn from(location: &str) -> Self {
        Self::SingleLocation(location.to_string())
    }
}

impl From<String> for DataInput {
    fn from(location: String) -> Self {
        Self::SingleLocation(location)
    }
}

impl From<Vec<String>> for DataInput {
    fn from(locations: Vec<String>) -> Self {
        Self::LocationList(locations)
    }
}

impl From<AutoMlInput> for DataInput {
    fn from(input: AutoMlInput) -> Self {
        Self::Structured(input)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings of an AutoML job
///
/// Optional fields left as `None` are omitted from the request. Explicit
/// zero or `false` values are sent as given.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoMlConfig {
    /// Role name or ARN
    pub role: String,
    pub target_attribute_name: String,
    pub output_kms_key: Option<String>,
    /// Defaults to `s3://<default bucket>/`
    pub output_path: Option<String>,
    pub base_job_name: Option<String>,
    pub compression_type: Option<String>,
    pub volume_kms_key: Option<String>,
    pub encrypt_inter_container_traffic: bool,
    pub vpc_config: Option<VpcConfig>,
    pub problem_type: Option<ProblemType>,
    pub max_candidates: Option<u32>,
    pub max_runtime_per_training_job_in_seconds: Option<u64>,
    pub total_job_runtime_in_seconds: Option<u64>,
    pub job_objective: Option<AutoMlJobObjective>,
    pub generate_candidate_definitions_only: bool,
    pub tags: Vec<Tag>,
}

impl AutoMlConfig {
    pub fn new(role: impl Into<String>, target_attribute_name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            target_attribute_name: target_attribute_name.into(),
            output_kms_key: None,
            output_path: None,
            base_job_name: None,
            compression_type: None,
            volume_kms_key: None,
            encrypt_inter_container_traffic: false,
            vpc_config: None,
            problem_type: None,
            max_candidates: None,
            max_runtime_per_training_job_in_seconds: None,
            total_job_runtime_in_seconds: None,
            job_objective: None,
            generate_candidate_definitions_only: false,
            tags: Vec::new(),
        }
    }

    pub fn with_problem_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = Some(problem_type);
        self
    }

    pub fn with_job_objective(mut self, metric_name: impl Into<String>) -> Self {
        self.job_objective = Some(AutoMlJobObjective::new(metric_name));
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: u32) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_base_job_name(mut self, base_job_name: impl Into<String>) -> Self {
        self.base_job_name = Some(base_job_name.into());
        self
    }
}

/// Options of a single [`AutoMl::fit`] call
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub wait: bool,
    /// Stream job logs while waiting; requires `wait`
    pub logs: bool,
    pub job_name: Option<String>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            wait: true,
            logs: true,
            job_name: None,
        }
    }
}

impl FitOptions {
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            logs: false,
            job_name: None,
        }
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }
}

/// Filters for [`AutoMl::list_candidates`]
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub status_equals: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_arn: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub sort_by: Option<CandidateSortBy>,
    pub max_results: Option<u32>,
}

/// Options of [`AutoMl::deploy`]
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub initial_instance_count: u32,
    pub instance_type: String,
    /// Candidate to deploy; the best candidate when `None`
    pub candidate: Option<Candidate>,
    /// Pipeline model name; derived from the first container image when `None`
    pub model_name: Option<String>,
    /// Endpoint name; the current job name when `None`
    pub endpoint_name: Option<String>,
    pub tags: Vec<Tag>,
    pub wait: bool,
    /// Point an existing endpoint at the new configuration instead of creating one
    pub update_endpoint: bool,
    pub vpc_config: Option<VpcConfig>,
    pub enable_network_isolation: bool,
}

impl DeployOptions {
    pub fn new(initial_instance_count: u32, instance_type: impl Into<String>) -> Self {
        Self {
            initial_instance_count,
            instance_type: instance_type.into(),
            candidate: None,
            model_name: None,
            endpoint_name: None,
            tags: Vec::new(),
            wait: true,
            update_endpoint: false,
            vpc_config: None,
            enable_network_isolation: false,
        }
    }
}

// ============================================================================
// Request Builders
// ============================================================================

/// Rejects a problem type without an objective, or the reverse
pub fn check_problem_type_and_objective(
    problem_type: Option<ProblemType>,
    job_objective: Option<&AutoMlJobObjective>,
) -> Result<()> {
    if problem_type.is_some() != job_objective.is_some() {
        return Err(ClientError::validation(
            "One of problem type and objective metric provided. Either both of them should be provided or none of them should be provided.",
        ));
    }
    Ok(())
}

/// Builds the completion criteria; runtime limits only appear when given
pub fn completion_criteria(
    max_candidates: Option<u32>,
    max_runtime_per_training_job_in_seconds: Option<u64>,
    total_job_runtime_in_seconds: Option<u64>,
) -> CompletionCriteria {
    CompletionCriteria {
        max_candidates: max_candidates.unwrap_or(DEFAULT_MAX_CANDIDATES),
        max_runtime_per_training_job_in_seconds,
        max_job_runtime_in_seconds: total_job_runtime_in_seconds,
    }
}

/// Builds one input channel per location
///
/// A structured input supplies its own target attribute and compression.
/// `SingleLocation` must already be an `s3://` URI here.
pub fn build_channels(
    inputs: &DataInput,
    target_attribute_name: &str,
    compression_type: Option<&str>,
) -> Result<Vec<AutoMlChannel>> {
    let (locations, target, compression) = match inputs {
        DataInput::SingleLocation(location) => (
            std::slice::from_ref(location),
            target_attribute_name,
            compression_type,
        ),
        DataInput::LocationList(locations) => (
            locations.as_slice(),
            target_attribute_name,
            compression_type,
        ),
        DataInput::Structured(input) => (
            input.inputs.as_slice(),
            input.target_attribute_name.as_str(),
            input.compression.as_deref(),
        ),
    };

    require_target(target)?;
    if locations.is_empty() {
        return Err(ClientError::validation("AutoML input has no locations"));
    }
    if let Some(location) = locations.iter().find(|l| !is_s3_uri(l)) {
        return Err(ClientError::validation(format!(
            "AutoML input locations must be s3:// URIs, got {location}"
        )));
    }

    Ok(locations
        .iter()
        .map(|location| AutoMlChannel {
            data_source: AutoMlDataSource {
                s3_data_source: S3DataSource {
                    s3_data_type: "S3Prefix".to_string(),
                    s3_uri: location.clone(),
                },
            },
            target_attribute_name: target.to_string(),
            compression_type: compression.map(str::to_string),
        })
        .collect())
}

fn require_target(target: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(ClientError::validation(
            "target_attribute_name is required for AutoML input",
        ));
    }
    Ok(())
}

fn decode_field<T: serde::de::DeserializeOwned>(
    description: &Description,
    path: &str,
) -> Result<Option<T>> {
    description
        .decode_at::<T>(path)
        .transpose()
        .map_err(|e| ClientError::ParseError(format!("Invalid {path}: {e}")))
}

// ============================================================================
// AutoML
// ============================================================================

/// AutoML job launcher and result accessor
#[derive(Debug, Clone)]
pub struct AutoMl {
    session: Session,
    config: AutoMlConfig,
    current_job_name: Option<String>,
    latest_job: Option<JobHandle>,
    last_description: Option<Description>,
    best_candidate: Option<(String, Candidate)>,
}

impl AutoMl {
    pub fn new(session: Session, config: AutoMlConfig) -> Self {
        Self {
            session,
            config,
            current_job_name: None,
            latest_job: None,
            last_description: None,
            best_candidate: None,
        }
    }

    pub fn config(&self) -> &AutoMlConfig {
        &self.config
    }

    pub fn current_job_name(&self) -> Option<&str> {
        self.current_job_name.as_deref()
    }

    pub fn latest_job(&self) -> Option<&JobHandle> {
        self.latest_job.as_ref()
    }

    /// Rebuilds an `AutoMl` from an existing job
    ///
    /// # Arguments
    /// * `session` - Session to talk to the platform
    /// * `job_name` - Name of the AutoML job
    pub async fn attach(session: Session, job_name: &str) -> Result<Self> {
        let description = session
            .control()
            .describe_job(JobKind::AutoMl, job_name)
            .await?;

        let channels: Vec<AutoMlChannel> =
            decode_field(&description, "InputDataConfig")?.unwrap_or_default();
        let channel = channels.first();
        let output: Option<OutputDataConfig> = decode_field(&description, "OutputDataConfig")?;
        let criteria: Option<CompletionCriteria> =
            decode_field(&description, "AutoMLJobConfig.CompletionCriteria")?;
        let role = description
            .str_at("RoleArn")
            .ok_or_else(|| ClientError::ParseError(format!("{job_name} has no RoleArn")))?;

        let config = AutoMlConfig {
            role: role.to_string(),
            target_attribute_name: channel
                .map(|c| c.target_attribute_name.clone())
                .unwrap_or_default(),
            output_kms_key: output.as_ref().and_then(|o| o.kms_key_id.clone()),
            output_path: output.map(|o| o.s3_output_path),
            base_job_name: None,
            compression_type: channel.and_then(|c| c.compression_type.clone()),
            volume_kms_key: description
                .str_at("AutoMLJobConfig.SecurityConfig.VolumeKmsKeyId")
                .map(str::to_string),
            encrypt_inter_container_traffic: description
                .at("AutoMLJobConfig.SecurityConfig.EnableInterContainerTrafficEncryption")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            vpc_config: decode_field(&description, "AutoMLJobConfig.SecurityConfig.VpcConfig")?,
            problem_type: decode_field(&description, "ProblemType")?,
            max_candidates: criteria.map(|c| c.max_candidates),
            max_runtime_per_training_job_in_seconds: criteria
                .and_then(|c| c.max_runtime_per_training_job_in_seconds),
            total_job_runtime_in_seconds: criteria.and_then(|c| c.max_job_runtime_in_seconds),
            job_objective: decode_field(&description, "AutoMLJobObjective")?,
            generate_candidate_definitions_only: description
                .at("GenerateCandidateDefinitionsOnly")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            tags: Vec::new(),
        };

        let mut automl = Self::new(session.clone(), config);
        automl.current_job_name = Some(job_name.to_string());
        automl.latest_job = Some(JobHandle::new(session, JobKind::AutoMl, job_name));
        automl.last_description = Some(description);
        Ok(automl)
    }

    /// Submits an AutoML job
    ///
    /// # Arguments
    /// * `inputs` - Training data; a local single path is uploaded first
    /// * `options` - Wait, log and job name settings
    ///
    /// # Returns
    /// Handle to the submitted job
    pub async fn fit(&mut self, inputs: impl Into<DataInput>, options: FitOptions) -> Result<JobHandle> {
        if options.logs && !options.wait {
            return Err(ClientError::validation(
                "Logs can only be shown if wait is set to True. Please either set wait to True or set logs to False.",
            ));
        }
        check_problem_type_and_objective(
            self.config.problem_type,
            self.config.job_objective.as_ref(),
        )?;

        let mut inputs = inputs.into();
        let target = match &inputs {
            DataInput::Structured(input) => input.target_attribute_name.as_str(),
            _ => self.config.target_attribute_name.as_str(),
        };
        require_target(target)?;

        if let DataInput::SingleLocation(location) = &inputs
            && !is_s3_uri(location)
        {
            let uploaded = self
                .session
                .upload_data(location, None, INPUT_KEY_PREFIX)
                .await?;
            inputs = DataInput::SingleLocation(uploaded);
        }

        let job_name = options.job_name.clone().unwrap_or_else(|| {
            let base = self
                .config
                .base_job_name
                .as_deref()
                .unwrap_or(DEFAULT_BASE_JOB_NAME);
            name_from_base(base, MAX_JOB_NAME_LEN)
        });
        if self.config.output_path.is_none() {
            self.config.output_path = Some(format!("s3://{}/", self.session.default_bucket()));
        }

        let request = self.job_request(&job_name, &inputs)?;

        info!(job = %job_name, channels = request.input_data_config.len(), "Creating AutoML job");
        self.session.control().create_auto_ml_job(&request).await?;

        self.current_job_name = Some(job_name.clone());
        let job = self
            .latest_job
            .insert(JobHandle::new(self.session.clone(), JobKind::AutoMl, job_name));
        if options.wait {
            let description = job.wait(options.logs).await?;
            self.last_description = Some(description);
        }

        Ok(job.clone())
    }

    /// Builds the `CreateAutoMLJob` request for resolved inputs
    pub fn job_request(&self, job_name: &str, inputs: &DataInput) -> Result<CreateAutoMlJobRequest> {
        check_problem_type_and_objective(
            self.config.problem_type,
            self.config.job_objective.as_ref(),
        )?;

        let output_path = self
            .config
            .output_path
            .clone()
            .unwrap_or_else(|| format!("s3://{}/", self.session.default_bucket()));

        Ok(CreateAutoMlJobRequest {
            job_name: job_name.to_string(),
            input_data_config: build_channels(
                inputs,
                &self.config.target_attribute_name,
                self.config.compression_type.as_deref(),
            )?,
            output_data_config: OutputDataConfig {
                s3_output_path: output_path,
                kms_key_id: self.config.output_kms_key.clone(),
            },
            job_config: AutoMlJobConfig {
                completion_criteria: completion_criteria(
                    self.config.max_candidates,
                    self.config.max_runtime_per_training_job_in_seconds,
                    self.config.total_job_runtime_in_seconds,
                ),
                security_config: SecurityConfig {
                    enable_inter_container_traffic_encryption: self
                        .config
                        .encrypt_inter_container_traffic,
                    volume_kms_key_id: self.config.volume_kms_key.clone(),
                    vpc_config: self.config.vpc_config.clone(),
                },
            },
            role_arn: self.session.expand_role(&self.config.role),
            generate_candidate_definitions_only: self.config.generate_candidate_definitions_only,
            problem_type: self.config.problem_type,
            job_objective: self.config.job_objective.clone(),
            tags: self.config.tags.clone(),
        })
    }

    fn job_name_or_current(&self, job_name: Option<&str>) -> Result<String> {
        job_name
            .or(self.current_job_name.as_deref())
            .map(str::to_string)
            .ok_or_else(|| ClientError::validation("No AutoML job name given and no job has been run"))
    }

    // =============================================================================
    // Results
    // =============================================================================

    /// Describes an AutoML job, the current one when `job_name` is `None`
    pub async fn describe_auto_ml_job(&mut self, job_name: Option<&str>) -> Result<Description> {
        let job_name = self.job_name_or_current(job_name)?;
        let description = self
            .session
            .control()
            .describe_job(JobKind::AutoMl, &job_name)
            .await?;
        self.last_description = Some(description.clone());
        Ok(description)
    }

    /// Returns the best candidate of a job
    ///
    /// The result is cached with the job name it belongs to; asking for a
    /// different job fetches again.
    pub async fn best_candidate(&mut self, job_name: Option<&str>) -> Result<Candidate> {
        let job_name = self.job_name_or_current(job_name)?;

        if let Some((cached_for, candidate)) = &self.best_candidate
            && *cached_for == job_name
        {
            debug!(job = %job_name, "Using cached best candidate");
            return Ok(candidate.clone());
        }

        let description = self.describe_auto_ml_job(Some(&job_name)).await?;
        let candidate = match description.decode_at::<Candidate>("BestCandidate") {
            Some(Ok(candidate)) => candidate,
            Some(Err(e)) => {
                return Err(ClientError::ParseError(format!(
                    "Invalid BestCandidate for {job_name}: {e}"
                )));
            }
            None => {
                let status = description.str_at("AutoMLJobStatus").unwrap_or("Unknown");
                return Err(ClientError::not_yet_available(
                    "BestCandidate",
                    job_name,
                    format!("job status is {status}"),
                ));
            }
        };

        self.best_candidate = Some((job_name, candidate.clone()));
        Ok(candidate)
    }

    /// Lists candidates of a job, the current one when `job_name` is `None`
    pub async fn list_candidates(
        &self,
        job_name: Option<&str>,
        filter: CandidateFilter,
    ) -> Result<Vec<Candidate>> {
        let request = ListCandidatesRequest {
            job_name: self.job_name_or_current(job_name)?,
            status_equals: filter.status_equals,
            candidate_name_equals: filter.candidate_name,
            candidate_arn_equals: filter.candidate_arn,
            sort_order: filter.sort_order,
            sort_by: filter.sort_by,
            max_results: filter.max_results,
        };
        self.session.control().list_candidates(&request).await
    }

    // =============================================================================
    // Deployment
    // =============================================================================

    /// Deploys a candidate behind an endpoint
    ///
    /// # Returns
    /// A predictor for the endpoint
    pub async fn deploy(&mut self, options: DeployOptions) -> Result<Predictor> {
        let candidate = match options.candidate.clone() {
            Some(candidate) => candidate,
            None => self.best_candidate(None).await?,
        };

        let first_image = candidate
            .inference_containers
            .first()
            .map(|c| c.image.clone())
            .ok_or_else(|| {
                ClientError::validation(format!(
                    "Candidate {} has no inference containers",
                    candidate.candidate_name
                ))
            })?;

        let model_name = options
            .model_name
            .clone()
            .unwrap_or_else(|| name_from_base(&base_name_from_image(&first_image), MAX_MODEL_NAME_LEN));
        let endpoint_name = match options.endpoint_name.clone() {
            Some(name) => name,
            None => self.job_name_or_current(None)?,
        };
        let role_arn = self.session.expand_role(&self.config.role);

        let model = CreateModelRequest {
            model_name: model_name.clone(),
            containers: candidate
                .inference_containers
                .iter()
                .map(|c| ContainerDefinition {
                    image: c.image.clone(),
                    model_data_url: c.model_data_url.clone(),
                    environment: c.environment.clone(),
                })
                .collect(),
            execution_role_arn: role_arn,
            vpc_config: options.vpc_config.clone(),
            enable_network_isolation: options.enable_network_isolation,
            tags: Vec::new(),
        };
        info!(
            model = %model_name,
            candidate = %candidate.candidate_name,
            containers = model.containers.len(),
            "Creating pipeline model"
        );
        self.session.control().create_model(&model).await?;

        let endpoint_config_name = if options.update_endpoint {
            model_name.clone()
        } else {
            endpoint_name.clone()
        };
        self.session
            .control()
            .create_endpoint_config(&CreateEndpointConfigRequest {
                endpoint_config_name: endpoint_config_name.clone(),
                production_variants: vec![ProductionVariant {
                    variant_name: "AllTraffic".to_string(),
                    model_name: model_name.clone(),
                    initial_instance_count: options.initial_instance_count,
                    instance_type: options.instance_type.clone(),
                    initial_variant_weight: 1.0,
                }],
                data_capture_config: None,
                kms_key_id: None,
                tags: options.tags.clone(),
            })
            .await?;

        let endpoint = EndpointRequest {
            endpoint_name: endpoint_name.clone(),
            endpoint_config_name,
            tags: options.tags.clone(),
        };
        if options.update_endpoint {
            info!(endpoint = %endpoint_name, "Updating endpoint");
            self.session.control().update_endpoint(&endpoint).await?;
        } else {
            info!(endpoint = %endpoint_name, "Creating endpoint");
            self.session.control().create_endpoint(&endpoint).await?;
        }

        if options.wait {
            wait_for_endpoint(&self.session, &endpoint_name, WaitOptions::default()).await?;
        }

        Ok(Predictor::new(self.session.clone(), endpoint_name))
    }
}
