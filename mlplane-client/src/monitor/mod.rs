//! Model monitoring
//!
//! A [`ModelMonitor`] runs baselining jobs over a reference dataset and
//! manages one monitoring schedule that periodically analyzes the traffic
//! captured from an endpoint. The analyzer is either the platform's default
//! image, which is driven entirely through environment variables, or a
//! custom container with its own entrypoint.

pub mod expressions;
pub mod files;

pub use expressions::{CronExpression, DatasetFormat};
pub use files::{ConstraintViolations, Constraints, MonitoringFile, Statistics};

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use mlplane_core::domain::description::Description;
use mlplane_core::domain::schedule::ExecutionRecord;
use mlplane_core::dto::common::{ClusterConfig, NetworkConfig, S3Output, StoppingCondition, Tag};
use mlplane_core::dto::monitoring::{
    BaselineConfig, CreateMonitoringScheduleRequest, EndpointInput, MonitoringAppSpecification,
    MonitoringInput, MonitoringJobDefinition, MonitoringOutput, MonitoringOutputConfig,
    MonitoringResources, MonitoringScheduleConfig, S3Resource, ScheduleConfig,
};

use crate::error::{ClientError, Result};
use crate::images::{default_monitor_image_uri, is_default_monitor_image};
use crate::job::{JobHandle, job_status};
use crate::naming::{base_name_from_image, name_from_base};
use crate::processing::{ProcessingInput, ProcessingOutput, Processor, ProcessorConfig, RunOptions};
use crate::s3::{S3Uri, is_s3_uri, s3_path_join};
use crate::schedule::ScheduleHandle;
use crate::session::Session;
use files::{CONSTRAINT_VIOLATIONS_FILE_NAME, CONSTRAINTS_FILE_NAME, STATISTICS_FILE_NAME};

const MAX_NAME_LEN: usize = 63;
const DEFAULT_VOLUME_SIZE_IN_GB: u32 = 30;
const DEFAULT_BASELINING_MAX_RUNTIME_IN_SECONDS: u64 = 86400;
const DEFAULT_EXECUTION_MAX_RUNTIME_IN_SECONDS: u64 = 3600;

const ENDPOINT_INPUT_PATH: &str = "/opt/ml/processing/input/endpoint";
const BASELINE_DATASET_INPUT_NAME: &str = "baseline_dataset_input";
const BASELINE_DATASET_PATH: &str = "/opt/ml/processing/input/baseline_dataset_input";
const RECORD_PREPROCESSOR_INPUT_NAME: &str = "pre_processor_script_input";
const POST_ANALYTICS_INPUT_NAME: &str = "post_processor_script_input";
const MONITORING_OUTPUT_NAME: &str = "monitoring_output";
const MONITORING_OUTPUT_PATH: &str = "/opt/ml/processing/output";
const PROCESSING_OUTPUT_URI: &str = "ProcessingOutputConfig.Outputs.0.S3Output.S3Uri";

const ENV_DATASET_FORMAT: &str = "dataset_format";
const ENV_DATASET_SOURCE: &str = "dataset_source";
const ENV_OUTPUT_PATH: &str = "output_path";
const ENV_RECORD_PREPROCESSOR: &str = "record_preprocessor_script";
const ENV_POST_ANALYTICS: &str = "post_analytics_processor_script";
const ENV_PUBLISH_METRICS: &str = "publish_cloudwatch_metrics";

/// Environment keys the default analyzer reads
const ANALYZER_ENV_KEYS: [&str; 6] = [
    ENV_DATASET_FORMAT,
    ENV_DATASET_SOURCE,
    ENV_OUTPUT_PATH,
    ENV_RECORD_PREPROCESSOR,
    ENV_POST_ANALYTICS,
    ENV_PUBLISH_METRICS,
];

// ============================================================================
// Configuration
// ============================================================================

/// Container that analyzes datasets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analyzer {
    /// The platform analyzer for the session's region
    Default,
    Custom {
        image_uri: String,
        entrypoint: Option<Vec<String>>,
        arguments: Option<Vec<String>>,
    },
}

impl Analyzer {
    pub fn custom(image_uri: impl Into<String>) -> Self {
        Self::Custom {
            image_uri: image_uri.into(),
            entrypoint: None,
            arguments: None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Cluster and job settings shared by baselining jobs and scheduled executions
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Role name or ARN
    pub role: String,
    pub instance_count: u32,
    pub instance_type: String,
    pub volume_size_in_gb: u32,
    pub volume_kms_key: Option<String>,
    pub output_kms_key: Option<String>,
    pub max_runtime_in_seconds: Option<u64>,
    pub base_job_name: Option<String>,
    pub env: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub network_config: Option<NetworkConfig>,
}

impl MonitorConfig {
    pub fn new(role: impl Into<String>, instance_count: u32, instance_type: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            instance_count,
            instance_type: instance_type.into(),
            volume_size_in_gb: DEFAULT_VOLUME_SIZE_IN_GB,
            volume_kms_key: None,
            output_kms_key: None,
            max_runtime_in_seconds: None,
            base_job_name: None,
            env: BTreeMap::new(),
            tags: Vec::new(),
            network_config: None,
        }
    }
}

/// Options of [`ModelMonitor::suggest_baseline`]
#[derive(Debug, Clone)]
pub struct BaselineOptions {
    /// Local path or `s3://` URI of the reference dataset
    pub baseline_dataset: String,
    pub dataset_format: DatasetFormat,
    /// Where results are written; under the job's prefix when `None`
    pub output_s3_uri: Option<String>,
    pub record_preprocessor_script: Option<String>,
    pub post_analytics_processor_script: Option<String>,
    pub job_name: Option<String>,
    pub wait: bool,
    pub logs: bool,
}

impl BaselineOptions {
    pub fn new(baseline_dataset: impl Into<String>, dataset_format: DatasetFormat) -> Self {
        Self {
            baseline_dataset: baseline_dataset.into(),
            dataset_format,
            output_s3_uri: None,
            record_preprocessor_script: None,
            post_analytics_processor_script: None,
            job_name: None,
            wait: true,
            logs: true,
        }
    }
}

/// Options of [`ModelMonitor::create_monitoring_schedule`]
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub endpoint_name: String,
    /// Where execution results are written; under the schedule's prefix when `None`
    pub output_s3_uri: Option<String>,
    /// Baseline statistics URI; from the latest baselining job when `None`
    pub statistics: Option<String>,
    /// Baseline constraints URI; from the latest baselining job when `None`
    pub constraints: Option<String>,
    pub schedule_cron_expression: Option<String>,
    pub schedule_name: Option<String>,
    pub record_preprocessor_script: Option<String>,
    pub post_analytics_processor_script: Option<String>,
    pub enable_cloudwatch_metrics: bool,
}

impl ScheduleOptions {
    pub fn new(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            output_s3_uri: None,
            statistics: None,
            constraints: None,
            schedule_cron_expression: None,
            schedule_name: None,
            record_preprocessor_script: None,
            post_analytics_processor_script: None,
            enable_cloudwatch_metrics: true,
        }
    }

    /// Uses the given baseline files
    pub fn with_baseline(mut self, statistics: &Statistics, constraints: &Constraints) -> Self {
        self.statistics = Some(statistics.file_s3_uri().to_string());
        self.constraints = Some(constraints.file_s3_uri().to_string());
        self
    }
}

/// Fields to change on an existing schedule; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ScheduleUpdate {
    pub endpoint_name: Option<String>,
    pub output_s3_uri: Option<String>,
    pub statistics: Option<String>,
    pub constraints: Option<String>,
    pub schedule_cron_expression: Option<String>,
    pub instance_count: Option<u32>,
    pub instance_type: Option<String>,
    pub volume_size_in_gb: Option<u32>,
    pub volume_kms_key: Option<String>,
    pub output_kms_key: Option<String>,
    pub max_runtime_in_seconds: Option<u64>,
    pub env: Option<BTreeMap<String, String>>,
    pub network_config: Option<NetworkConfig>,
    pub enable_cloudwatch_metrics: Option<bool>,
    pub role: Option<String>,
}

// ============================================================================
// Model Monitor
// ============================================================================

/// Baselining and scheduled monitoring for one endpoint
#[derive(Debug, Clone)]
pub struct ModelMonitor {
    session: Session,
    analyzer: Analyzer,
    config: MonitorConfig,
    schedule: Option<ScheduleHandle>,
    baselining_jobs: Vec<JobHandle>,
    statistics_cache: Option<(String, Statistics)>,
    constraints_cache: Option<(String, Constraints)>,
}

impl ModelMonitor {
    pub fn new(session: Session, analyzer: Analyzer, config: MonitorConfig) -> Self {
        Self {
            session,
            analyzer,
            config,
            schedule: None,
            baselining_jobs: Vec::new(),
            statistics_cache: None,
            constraints_cache: None,
        }
    }

    /// Rebuilds a monitor from an existing schedule
    ///
    /// The analyzer is recognized as the default one when the schedule uses
    /// the platform analyzer image.
    pub async fn attach(session: Session, schedule_name: &str) -> Result<Self> {
        let mut schedule = ScheduleHandle::new(session.clone(), schedule_name);
        let description = schedule.describe().await?;
        let definition = schedule_config(&description)?.monitoring_job_definition;

        let app = definition.monitoring_app_specification;
        let analyzer = if is_default_monitor_image(&app.image_uri) {
            Analyzer::Default
        } else {
            Analyzer::Custom {
                image_uri: app.image_uri,
                entrypoint: app.container_entrypoint,
                arguments: app.container_arguments,
            }
        };

        let mut env = definition.environment.unwrap_or_default();
        if analyzer.is_default() {
            env.retain(|key, _| !ANALYZER_ENV_KEYS.contains(&key.as_str()));
        }

        let cluster = definition.monitoring_resources.cluster_config;
        let config = MonitorConfig {
            role: definition.role_arn,
            instance_count: cluster.instance_count,
            instance_type: cluster.instance_type,
            volume_size_in_gb: cluster.volume_size_in_gb,
            volume_kms_key: cluster.volume_kms_key_id,
            output_kms_key: definition.monitoring_output_config.kms_key_id,
            max_runtime_in_seconds: definition
                .stopping_condition
                .map(|s| s.max_runtime_in_seconds),
            base_job_name: None,
            env,
            tags: Vec::new(),
            network_config: definition.network_config,
        };

        debug!(schedule = %schedule_name, default_analyzer = analyzer.is_default(), "Attached monitor");
        let mut monitor = Self::new(session, analyzer, config);
        monitor.schedule = Some(schedule);
        Ok(monitor)
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Handle to the monitor's schedule, once one exists
    pub fn schedule(&self) -> Option<&ScheduleHandle> {
        self.schedule.as_ref()
    }

    pub fn schedule_mut(&mut self) -> Option<&mut ScheduleHandle> {
        self.schedule.as_mut()
    }

    pub fn monitoring_schedule_name(&self) -> Option<&str> {
        self.schedule.as_ref().map(ScheduleHandle::name)
    }

    pub fn latest_baselining_job(&self) -> Option<&JobHandle> {
        self.baselining_jobs.last()
    }

    /// Image the analyzer runs
    pub fn image_uri(&self) -> Result<String> {
        match &self.analyzer {
            Analyzer::Default => default_monitor_image_uri(self.session.region()),
            Analyzer::Custom { image_uri, .. } => Ok(image_uri.clone()),
        }
    }

    fn generate_name(&self, image_uri: &str) -> String {
        let base = self
            .config
            .base_job_name
            .clone()
            .unwrap_or_else(|| base_name_from_image(image_uri));
        name_from_base(&base, MAX_NAME_LEN)
    }

    fn require_schedule(&self) -> Result<&ScheduleHandle> {
        self.schedule
            .as_ref()
            .ok_or_else(|| ClientError::validation("This monitor has no monitoring schedule"))
    }

    fn require_schedule_mut(&mut self) -> Result<&mut ScheduleHandle> {
        self.schedule
            .as_mut()
            .ok_or_else(|| ClientError::validation("This monitor has no monitoring schedule"))
    }

    fn processor_config(
        &self,
        image_uri: String,
        entrypoint: Option<Vec<String>>,
        default_max_runtime: Option<u64>,
    ) -> ProcessorConfig {
        let mut config = ProcessorConfig::new(
            self.config.role.clone(),
            image_uri,
            self.config.instance_count,
            self.config.instance_type.clone(),
        );
        config.entrypoint = entrypoint;
        config.volume_size_in_gb = self.config.volume_size_in_gb;
        config.volume_kms_key = self.config.volume_kms_key.clone();
        config.output_kms_key = self.config.output_kms_key.clone();
        config.max_runtime_in_seconds = self.config.max_runtime_in_seconds.or(default_max_runtime);
        config.tags = self.config.tags.clone();
        config.network_config = self.config.network_config.clone();
        config
    }

    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            instance_count: self.config.instance_count,
            instance_type: self.config.instance_type.clone(),
            volume_size_in_gb: self.config.volume_size_in_gb,
            volume_kms_key_id: self.config.volume_kms_key.clone(),
        }
    }

    // =============================================================================
    // Baselining
    // =============================================================================

    /// Runs the default analyzer over a reference dataset
    ///
    /// The job writes `statistics.json` and `constraints.json`, read back with
    /// [`ModelMonitor::baseline_statistics`] and
    /// [`ModelMonitor::suggested_constraints`].
    pub async fn suggest_baseline(&mut self, options: BaselineOptions) -> Result<JobHandle> {
        if !self.analyzer.is_default() {
            return Err(ClientError::validation(
                "suggest_baseline requires the default analyzer; use run_baseline with a custom analyzer",
            ));
        }

        let image_uri = self.image_uri()?;
        let job_name = options
            .job_name
            .clone()
            .unwrap_or_else(|| self.generate_name(&image_uri));

        let mut inputs = vec![
            ProcessingInput::new(&options.baseline_dataset, BASELINE_DATASET_PATH)
                .with_name(BASELINE_DATASET_INPUT_NAME),
        ];

        let mut env = self.config.env.clone();
        env.insert(
            ENV_DATASET_FORMAT.to_string(),
            options.dataset_format.to_env_value(),
        );
        env.insert(ENV_DATASET_SOURCE.to_string(), BASELINE_DATASET_PATH.to_string());
        env.insert(ENV_OUTPUT_PATH.to_string(), MONITORING_OUTPUT_PATH.to_string());
        env.insert(ENV_PUBLISH_METRICS.to_string(), "Disabled".to_string());

        for (script, input_name, env_key) in [
            (
                &options.record_preprocessor_script,
                RECORD_PREPROCESSOR_INPUT_NAME,
                ENV_RECORD_PREPROCESSOR,
            ),
            (
                &options.post_analytics_processor_script,
                POST_ANALYTICS_INPUT_NAME,
                ENV_POST_ANALYTICS,
            ),
        ] {
            if let Some(script) = script {
                let (input, container_path) = script_input(script, input_name)?;
                inputs.push(input);
                env.insert(env_key.to_string(), container_path);
            }
        }

        let mut output =
            ProcessingOutput::new(MONITORING_OUTPUT_PATH).with_name(MONITORING_OUTPUT_NAME);
        if let Some(uri) = &options.output_s3_uri {
            output = output.with_destination(uri);
        }

        let processor_config = self
            .processor_config(image_uri, None, Some(DEFAULT_BASELINING_MAX_RUNTIME_IN_SECONDS))
            .with_env(env);

        info!(job = %job_name, dataset = %options.baseline_dataset, "Suggesting baseline");
        let mut processor = Processor::new(self.session.clone(), processor_config);
        let outcome = processor
            .run(
                inputs,
                vec![output],
                RunOptions {
                    arguments: None,
                    job_name: Some(job_name),
                    wait: options.wait,
                    logs: options.logs,
                },
            )
            .await;

        self.record_baselining_job(&processor, outcome)
    }

    /// Runs a custom analyzer over caller-supplied inputs
    ///
    /// The analyzer's arguments are used unless `options` carries its own.
    pub async fn run_baseline(
        &mut self,
        inputs: Vec<ProcessingInput>,
        output: ProcessingOutput,
        mut options: RunOptions,
    ) -> Result<JobHandle> {
        let (image_uri, entrypoint, arguments) = match &self.analyzer {
            Analyzer::Custom {
                image_uri,
                entrypoint,
                arguments,
            } => (image_uri.clone(), entrypoint.clone(), arguments.clone()),
            Analyzer::Default => {
                return Err(ClientError::validation(
                    "run_baseline requires a custom analyzer; use suggest_baseline with the default analyzer",
                ));
            }
        };

        if options.job_name.is_none() {
            options.job_name = Some(self.generate_name(&image_uri));
        }
        options.arguments = options.arguments.or(arguments);

        let mut processor_config = self.processor_config(image_uri, entrypoint, None);
        if !self.config.env.is_empty() {
            processor_config.env = Some(self.config.env.clone());
        }

        let mut processor = Processor::new(self.session.clone(), processor_config);
        let outcome = processor.run(inputs, vec![output], options).await;

        self.record_baselining_job(&processor, outcome)
    }

    /// Keeps the submitted job even when waiting on it failed
    fn record_baselining_job(
        &mut self,
        processor: &Processor,
        outcome: Result<JobHandle>,
    ) -> Result<JobHandle> {
        match outcome {
            Ok(job) => {
                self.baselining_jobs.push(job.clone());
                Ok(job)
            }
            Err(e) => {
                if let Some(job) = processor.latest_job() {
                    warn!(job = %job.name(), error = %e, "Baselining job submitted but wait failed");
                    self.baselining_jobs.push(job.clone());
                }
                Err(e)
            }
        }
    }

    fn latest_baselining_job_name(&self) -> Result<String> {
        self.latest_baselining_job()
            .map(|job| job.name().to_string())
            .ok_or_else(|| ClientError::validation("No baselining job has been run by this monitor"))
    }

    /// Output location of the latest baselining job, once it has results
    async fn baselining_output(&mut self, resource: &str) -> Result<String> {
        let job = self
            .baselining_jobs
            .last_mut()
            .ok_or_else(|| ClientError::validation("No baselining job has been run by this monitor"))?;

        let description = job.describe().await?;
        let status = job_status(job.kind(), &description)?;
        if !status.has_results() {
            return Err(ClientError::not_yet_available(
                resource,
                job.name(),
                format!("baselining job status is {status}"),
            ));
        }

        description
            .str_at(PROCESSING_OUTPUT_URI)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::ParseError(format!("Baselining job {} has no output", job.name()))
            })
    }

    /// Statistics computed by the latest baselining job
    ///
    /// Read once per baselining job and cached.
    pub async fn baseline_statistics(&mut self) -> Result<Statistics> {
        let job_name = self.latest_baselining_job_name()?;
        if let Some((cached_for, statistics)) = &self.statistics_cache
            && *cached_for == job_name
        {
            return Ok(statistics.clone());
        }

        let output = self.baselining_output(STATISTICS_FILE_NAME).await?;
        let uri = s3_path_join([output.as_str(), STATISTICS_FILE_NAME]);
        let statistics = Statistics::from_s3_uri(&self.session, &uri).await?;

        self.statistics_cache = Some((job_name, statistics.clone()));
        Ok(statistics)
    }

    /// Constraints suggested by the latest baselining job
    ///
    /// Read once per baselining job and cached.
    pub async fn suggested_constraints(&mut self) -> Result<Constraints> {
        let job_name = self.latest_baselining_job_name()?;
        if let Some((cached_for, constraints)) = &self.constraints_cache
            && *cached_for == job_name
        {
            return Ok(constraints.clone());
        }

        let output = self.baselining_output(CONSTRAINTS_FILE_NAME).await?;
        let uri = s3_path_join([output.as_str(), CONSTRAINTS_FILE_NAME]);
        let constraints = Constraints::from_s3_uri(&self.session, &uri).await?;

        self.constraints_cache = Some((job_name, constraints.clone()));
        Ok(constraints)
    }

    // =============================================================================
    // Schedules
    // =============================================================================

    /// Creates the monitor's schedule
    ///
    /// # Arguments
    /// * `options` - Endpoint, baseline, output and schedule settings
    ///
    /// # Returns
    /// Handle to the new schedule. A monitor owns at most one schedule; a
    /// second call fails until the first schedule is deleted.
    pub async fn create_monitoring_schedule(&mut self, options: ScheduleOptions) -> Result<ScheduleHandle> {
        if let Some(existing) = &self.schedule {
            return Err(ClientError::validation(format!(
                "Monitor already has schedule {}; update or delete it before creating another",
                existing.name()
            )));
        }

        let image_uri = self.image_uri()?;
        let schedule_name = options
            .schedule_name
            .clone()
            .unwrap_or_else(|| self.generate_name(&image_uri));

        let baseline_config = self
            .baseline_config(options.statistics.clone(), options.constraints.clone())
            .await?;

        let output_s3_uri = match &options.output_s3_uri {
            Some(uri) if !is_s3_uri(uri) => {
                return Err(ClientError::validation(format!(
                    "output_s3_uri must be an s3:// URI, got {uri}"
                )));
            }
            Some(uri) => uri.clone(),
            None => S3Uri::new(
                self.session.default_bucket(),
                format!("{schedule_name}/monitoring-output"),
            )
            .to_string(),
        };

        let record_preprocessor_source_uri = match &options.record_preprocessor_script {
            Some(script) => Some(
                self.upload_script(&schedule_name, script, RECORD_PREPROCESSOR_INPUT_NAME)
                    .await?,
            ),
            None => None,
        };
        let post_analytics_processor_source_uri = match &options.post_analytics_processor_script {
            Some(script) => Some(
                self.upload_script(&schedule_name, script, POST_ANALYTICS_INPUT_NAME)
                    .await?,
            ),
            None => None,
        };

        let env = self.schedule_env(options.enable_cloudwatch_metrics);
        let (container_entrypoint, container_arguments) = match &self.analyzer {
            Analyzer::Default => (None, None),
            Analyzer::Custom {
                entrypoint,
                arguments,
                ..
            } => (entrypoint.clone(), arguments.clone()),
        };

        let monitoring_job_definition = MonitoringJobDefinition {
            baseline_config,
            monitoring_inputs: vec![endpoint_input(&options.endpoint_name)],
            monitoring_output_config: MonitoringOutputConfig {
                monitoring_outputs: vec![monitoring_output(output_s3_uri)],
                kms_key_id: self.config.output_kms_key.clone(),
            },
            monitoring_resources: MonitoringResources {
                cluster_config: self.cluster_config(),
            },
            monitoring_app_specification: MonitoringAppSpecification {
                image_uri,
                container_entrypoint,
                container_arguments,
                record_preprocessor_source_uri,
                post_analytics_processor_source_uri,
            },
            stopping_condition: Some(StoppingCondition {
                max_runtime_in_seconds: self
                    .config
                    .max_runtime_in_seconds
                    .unwrap_or(DEFAULT_EXECUTION_MAX_RUNTIME_IN_SECONDS),
            }),
            environment: (!env.is_empty()).then_some(env),
            network_config: self.config.network_config.clone(),
            role_arn: self.session.expand_role(&self.config.role),
        };

        let request = CreateMonitoringScheduleRequest {
            monitoring_schedule_name: schedule_name.clone(),
            monitoring_schedule_config: MonitoringScheduleConfig {
                schedule_config: options
                    .schedule_cron_expression
                    .clone()
                    .map(|schedule_expression| ScheduleConfig { schedule_expression }),
                monitoring_job_definition,
            },
            tags: self.config.tags.clone(),
        };

        info!(
            schedule = %schedule_name,
            endpoint = %options.endpoint_name,
            cron = ?options.schedule_cron_expression,
            "Creating monitoring schedule"
        );
        self.session
            .control()
            .create_monitoring_schedule(&request)
            .await?;

        let schedule = ScheduleHandle::new(self.session.clone(), schedule_name);
        self.schedule = Some(schedule.clone());
        Ok(schedule)
    }

    /// Applies the supplied fields to the schedule's current configuration
    pub async fn update_monitoring_schedule(&mut self, update: ScheduleUpdate) -> Result<()> {
        let description = self.require_schedule_mut()?.describe().await?;
        let mut config = schedule_config(&description)?;
        let mut monitor_config = self.config.clone();

        if let Some(schedule_expression) = update.schedule_cron_expression {
            config.schedule_config = Some(ScheduleConfig { schedule_expression });
        }

        let definition = &mut config.monitoring_job_definition;

        if let Some(endpoint_name) = &update.endpoint_name {
            definition.monitoring_inputs = vec![endpoint_input(endpoint_name)];
        }
        if let Some(uri) = update.output_s3_uri {
            let outputs = &mut definition.monitoring_output_config.monitoring_outputs;
            if outputs.is_empty() {
                outputs.push(monitoring_output(uri));
            } else {
                for output in outputs.iter_mut() {
                    output.s3_output.s3_uri = uri.clone();
                }
            }
        }
        if let Some(key) = update.output_kms_key {
            definition.monitoring_output_config.kms_key_id = Some(key.clone());
            monitor_config.output_kms_key = Some(key);
        }

        if update.statistics.is_some() || update.constraints.is_some() {
            let baseline = definition.baseline_config.get_or_insert_with(BaselineConfig::default);
            if let Some(s3_uri) = update.statistics {
                baseline.statistics_resource = Some(S3Resource { s3_uri });
            }
            if let Some(s3_uri) = update.constraints {
                baseline.constraints_resource = Some(S3Resource { s3_uri });
            }
        }

        let cluster = &mut definition.monitoring_resources.cluster_config;
        if let Some(instance_count) = update.instance_count {
            cluster.instance_count = instance_count;
            monitor_config.instance_count = instance_count;
        }
        if let Some(instance_type) = update.instance_type {
            cluster.instance_type = instance_type.clone();
            monitor_config.instance_type = instance_type;
        }
        if let Some(volume_size_in_gb) = update.volume_size_in_gb {
            cluster.volume_size_in_gb = volume_size_in_gb;
            monitor_config.volume_size_in_gb = volume_size_in_gb;
        }
        if let Some(key) = update.volume_kms_key {
            cluster.volume_kms_key_id = Some(key.clone());
            monitor_config.volume_kms_key = Some(key);
        }

        if let Some(max_runtime_in_seconds) = update.max_runtime_in_seconds {
            definition.stopping_condition = Some(StoppingCondition {
                max_runtime_in_seconds,
            });
            monitor_config.max_runtime_in_seconds = Some(max_runtime_in_seconds);
        }

        if let Some(env) = update.env {
            let mut merged = BTreeMap::new();
            if self.analyzer.is_default() {
                merged.extend(
                    definition
                        .environment
                        .take()
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|(key, _)| ANALYZER_ENV_KEYS.contains(&key.as_str())),
                );
            }
            merged.extend(env.clone());
            definition.environment = Some(merged);
            monitor_config.env = env;
        }
        if let Some(enabled) = update.enable_cloudwatch_metrics {
            definition
                .environment
                .get_or_insert_with(BTreeMap::new)
                .insert(ENV_PUBLISH_METRICS.to_string(), metrics_flag(enabled));
        }

        if let Some(network_config) = update.network_config {
            definition.network_config = Some(network_config.clone());
            monitor_config.network_config = Some(network_config);
        }
        if let Some(role) = update.role {
            definition.role_arn = self.session.expand_role(&role);
            monitor_config.role = role;
        }

        self.require_schedule()?.update(config).await?;
        self.config = monitor_config;
        Ok(())
    }

    /// Describes the monitor's schedule
    pub async fn describe_schedule(&mut self) -> Result<Description> {
        self.require_schedule_mut()?.describe().await
    }

    pub async fn start_monitoring_schedule(&self) -> Result<()> {
        self.require_schedule()?.start().await
    }

    pub async fn stop_monitoring_schedule(&self) -> Result<()> {
        self.require_schedule()?.stop().await
    }

    /// Deletes the schedule; the monitor can create a new one afterwards
    pub async fn delete_monitoring_schedule(&mut self) -> Result<()> {
        self.require_schedule()?.delete().await?;
        self.schedule = None;
        Ok(())
    }

    /// Executions of the schedule, oldest first
    pub async fn list_executions(&self) -> Result<Vec<ExecutionRecord>> {
        self.require_schedule()?.list_executions().await
    }

    /// Statistics written by the most recent execution
    pub async fn latest_monitoring_statistics(&self) -> Result<Statistics> {
        let uri = self.latest_execution_file(STATISTICS_FILE_NAME).await?;
        let schedule_name = self.require_schedule()?.name().to_string();
        Statistics::from_s3_uri(&self.session, &uri)
            .await
            .map_err(|e| missing_file(e, STATISTICS_FILE_NAME, schedule_name, &uri))
    }

    /// Constraint violations found by the most recent execution
    pub async fn latest_monitoring_constraint_violations(&self) -> Result<ConstraintViolations> {
        let uri = self
            .latest_execution_file(CONSTRAINT_VIOLATIONS_FILE_NAME)
            .await?;
        let schedule_name = self.require_schedule()?.name().to_string();
        ConstraintViolations::from_s3_uri(&self.session, &uri)
            .await
            .map_err(|e| missing_file(e, CONSTRAINT_VIOLATIONS_FILE_NAME, schedule_name, &uri))
    }

    async fn latest_execution_file(&self, file_name: &str) -> Result<String> {
        let schedule = self.require_schedule()?;
        let executions = schedule.list_executions().await?;

        let Some(latest) = executions.last() else {
            return Err(ClientError::not_yet_available(
                file_name,
                schedule.name(),
                "the schedule has no executions yet",
            ));
        };
        let Some(output) = &latest.output else {
            return Err(ClientError::not_yet_available(
                file_name,
                schedule.name(),
                format!(
                    "execution {} has no output location",
                    latest.processing_job_name
                ),
            ));
        };

        Ok(s3_path_join([output.as_str(), file_name]))
    }

    // =============================================================================
    // Helpers
    // =============================================================================

    async fn baseline_config(
        &mut self,
        statistics: Option<String>,
        constraints: Option<String>,
    ) -> Result<Option<BaselineConfig>> {
        let has_baselining_job = !self.baselining_jobs.is_empty();

        let statistics = match statistics {
            Some(uri) => Some(uri),
            None if has_baselining_job => {
                Some(self.baseline_statistics().await?.file_s3_uri().to_string())
            }
            None => None,
        };
        let constraints = match constraints {
            Some(uri) => Some(uri),
            None if has_baselining_job => {
                Some(self.suggested_constraints().await?.file_s3_uri().to_string())
            }
            None => None,
        };

        if statistics.is_none() && constraints.is_none() {
            return Ok(None);
        }
        Ok(Some(BaselineConfig {
            statistics_resource: statistics.map(|s3_uri| S3Resource { s3_uri }),
            constraints_resource: constraints.map(|s3_uri| S3Resource { s3_uri }),
        }))
    }

    fn schedule_env(&self, enable_cloudwatch_metrics: bool) -> BTreeMap<String, String> {
        let mut env = self.config.env.clone();
        if self.analyzer.is_default() {
            env.insert(
                ENV_DATASET_FORMAT.to_string(),
                DatasetFormat::SagemakerCaptureJson.to_env_value(),
            );
            env.insert(ENV_DATASET_SOURCE.to_string(), ENDPOINT_INPUT_PATH.to_string());
            env.insert(ENV_OUTPUT_PATH.to_string(), MONITORING_OUTPUT_PATH.to_string());
            env.insert(
                ENV_PUBLISH_METRICS.to_string(),
                metrics_flag(enable_cloudwatch_metrics),
            );
        }
        env
    }

    /// Uploads a local script under the schedule's prefix
    async fn upload_script(&self, schedule_name: &str, script: &str, name: &str) -> Result<String> {
        if is_s3_uri(script) {
            return Ok(script.to_string());
        }
        self.session
            .upload_data(script, None, &format!("{schedule_name}/{name}"))
            .await
    }
}

fn schedule_config(description: &Description) -> Result<MonitoringScheduleConfig> {
    match description.decode_at::<MonitoringScheduleConfig>("MonitoringScheduleConfig") {
        Some(Ok(config)) => Ok(config),
        Some(Err(e)) => Err(ClientError::ParseError(format!(
            "Invalid MonitoringScheduleConfig: {e}"
        ))),
        None => Err(ClientError::ParseError(
            "Schedule description has no MonitoringScheduleConfig".to_string(),
        )),
    }
}

fn endpoint_input(endpoint_name: &str) -> MonitoringInput {
    MonitoringInput {
        endpoint_input: EndpointInput {
            endpoint_name: endpoint_name.to_string(),
            local_path: ENDPOINT_INPUT_PATH.to_string(),
            s3_input_mode: "File".to_string(),
            s3_data_distribution_type: "FullyReplicated".to_string(),
        },
    }
}

fn monitoring_output(s3_uri: String) -> MonitoringOutput {
    MonitoringOutput {
        s3_output: S3Output {
            s3_uri,
            local_path: MONITORING_OUTPUT_PATH.to_string(),
            s3_upload_mode: "Continuous".to_string(),
        },
    }
}

/// Input that mounts a script; returns it with the script's path in the container
fn script_input(script: &str, input_name: &str) -> Result<(ProcessingInput, String)> {
    let file_name = script
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ClientError::validation(format!("{script} does not name a file")))?;
    let destination = format!("/opt/ml/processing/input/{input_name}");
    let container_path = format!("{destination}/{file_name}");

    Ok((
        ProcessingInput::new(script, destination).with_name(input_name),
        container_path,
    ))
}

fn metrics_flag(enabled: bool) -> String {
    if enabled { "Enabled" } else { "Disabled" }.to_string()
}

fn missing_file(error: ClientError, file_name: &str, schedule_name: String, uri: &str) -> ClientError {
    if error.is_not_found() {
        ClientError::not_yet_available(file_name, schedule_name, format!("{uri} does not exist"))
    } else {
        error
    }
}
