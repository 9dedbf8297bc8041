//! Processing jobs
//!
//! A [`Processor`] turns a container image plus inputs and outputs into a
//! `CreateProcessingJob` request. Local input paths are uploaded to the
//! session's default bucket first, and unnamed channels get positional names.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use mlplane_core::domain::job::JobKind;
use mlplane_core::dto::common::{ClusterConfig, NetworkConfig, S3Output, StoppingCondition, Tag};
use mlplane_core::dto::processing::{
    AppSpecification, CreateProcessingJobRequest, ProcessingInputConfig, ProcessingOutputConfig,
    ProcessingOutputEntry, ProcessingResources, S3Input,
};

use crate::error::{ClientError, Result};
use crate::images::sklearn_image_uri;
use crate::job::JobHandle;
use crate::naming::{base_name_from_image, name_from_base};
use crate::s3::{S3Uri, is_s3_uri};
use crate::session::Session;

const MAX_JOB_NAME_LEN: usize = 63;
const DEFAULT_VOLUME_SIZE_IN_GB: u32 = 30;
const CODE_INPUT_NAME: &str = "code";
const CODE_CONTAINER_DIR: &str = "/opt/ml/processing/input/code/";

// ============================================================================
// Inputs and Outputs
// ============================================================================

/// Data made available to the processing container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInput {
    /// `s3://` URI or local path, uploaded before the job starts
    pub source: String,
    /// Path inside the container
    pub destination: String,
    pub input_name: Option<String>,
    pub s3_data_type: String,
    pub s3_input_mode: String,
    pub s3_data_distribution_type: String,
    pub s3_compression_type: Option<String>,
}

impl ProcessingInput {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            input_name: None,
            s3_data_type: "S3Prefix".to_string(),
            s3_input_mode: "File".to_string(),
            s3_data_distribution_type: "FullyReplicated".to_string(),
            s3_compression_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    fn to_config(&self) -> ProcessingInputConfig {
        ProcessingInputConfig {
            input_name: self.input_name.clone().unwrap_or_default(),
            s3_input: S3Input {
                s3_uri: self.source.clone(),
                local_path: self.destination.clone(),
                s3_data_type: self.s3_data_type.clone(),
                s3_input_mode: self.s3_input_mode.clone(),
                s3_data_distribution_type: self.s3_data_distribution_type.clone(),
                s3_compression_type: self.s3_compression_type.clone(),
            },
        }
    }
}

/// Data collected from the processing container when it finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutput {
    /// Path inside the container
    pub source: String,
    /// `s3://` destination; generated under the job's prefix when `None`
    pub destination: Option<String>,
    pub output_name: Option<String>,
    pub s3_upload_mode: String,
}

impl ProcessingOutput {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            output_name: None,
            s3_upload_mode: "EndOfJob".to_string(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    fn to_entry(&self) -> ProcessingOutputEntry {
        ProcessingOutputEntry {
            output_name: self.output_name.clone().unwrap_or_default(),
            s3_output: S3Output {
                s3_uri: self.destination.clone().unwrap_or_default(),
                local_path: self.source.clone(),
                s3_upload_mode: self.s3_upload_mode.clone(),
            },
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Container and cluster settings shared by every run of a processor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Role name or ARN
    pub role: String,
    pub image_uri: String,
    pub instance_count: u32,
    pub instance_type: String,
    pub entrypoint: Option<Vec<String>>,
    pub volume_size_in_gb: u32,
    pub volume_kms_key: Option<String>,
    pub output_kms_key: Option<String>,
    pub max_runtime_in_seconds: Option<u64>,
    /// Prefix for generated job names; derived from the image when `None`
    pub base_job_name: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
    pub tags: Vec<Tag>,
    pub network_config: Option<NetworkConfig>,
}

impl ProcessorConfig {
    pub fn new(
        role: impl Into<String>,
        image_uri: impl Into<String>,
        instance_count: u32,
        instance_type: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            image_uri: image_uri.into(),
            instance_count,
            instance_type: instance_type.into(),
            entrypoint: None,
            volume_size_in_gb: DEFAULT_VOLUME_SIZE_IN_GB,
            volume_kms_key: None,
            output_kms_key: None,
            max_runtime_in_seconds: None,
            base_job_name: None,
            env: None,
            tags: Vec::new(),
            network_config: None,
        }
    }

    pub fn with_entrypoint(mut self, entrypoint: Vec<String>) -> Self {
        self.entrypoint = Some(entrypoint);
        self
    }

    pub fn with_base_job_name(mut self, base_job_name: impl Into<String>) -> Self {
        self.base_job_name = Some(base_job_name.into());
        self
    }

    pub fn with_max_runtime(mut self, seconds: u64) -> Self {
        self.max_runtime_in_seconds = Some(seconds);
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn job_name(&self) -> String {
        let base = self
            .base_job_name
            .clone()
            .unwrap_or_else(|| base_name_from_image(&self.image_uri));
        name_from_base(&base, MAX_JOB_NAME_LEN)
    }
}

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub arguments: Option<Vec<String>>,
    /// Explicit job name; generated from the base job name when `None`
    pub job_name: Option<String>,
    pub wait: bool,
    pub logs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            arguments: None,
            job_name: None,
            wait: true,
            logs: true,
        }
    }
}

impl RunOptions {
    /// Submit only, without waiting or streaming logs
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            logs: false,
            ..Self::default()
        }
    }

    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Runs processing jobs for one container image
#[derive(Debug, Clone)]
pub struct Processor {
    session: Session,
    config: ProcessorConfig,
    jobs: Vec<JobHandle>,
}

impl Processor {
    pub fn new(session: Session, config: ProcessorConfig) -> Self {
        Self {
            session,
            config,
            jobs: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle to the most recently submitted job
    pub fn latest_job(&self) -> Option<&JobHandle> {
        self.jobs.last()
    }

    /// Every job submitted by this processor, oldest first
    pub fn jobs(&self) -> &[JobHandle] {
        &self.jobs
    }

    /// Submits a processing job
    ///
    /// # Arguments
    /// * `inputs` - Input channels; local sources are uploaded first
    /// * `outputs` - Output channels
    /// * `options` - Arguments, job name and wait behaviour
    ///
    /// # Returns
    /// Handle to the submitted job. When `options.wait` is set the handle's
    /// cached description carries the terminal status.
    pub async fn run(
        &mut self,
        inputs: Vec<ProcessingInput>,
        outputs: Vec<ProcessingOutput>,
        options: RunOptions,
    ) -> Result<JobHandle> {
        if options.logs && !options.wait {
            return Err(ClientError::validation(
                "Logs can only be shown if wait is set to True. Please either set wait to True or set logs to False.",
            ));
        }

        let job_name = options
            .job_name
            .clone()
            .unwrap_or_else(|| self.config.job_name());

        let inputs = self.normalize_inputs(&job_name, inputs).await?;
        let outputs = normalize_outputs(&self.session.default_bucket(), &job_name, outputs)?;
        let role_arn = self.session.expand_role(&self.config.role);

        let request = processing_request(
            &self.config,
            &job_name,
            &inputs,
            &outputs,
            options.arguments.clone(),
            role_arn,
        );

        info!(
            job = %job_name,
            image = %self.config.image_uri,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "Creating processing job"
        );
        self.session
            .control()
            .create_processing_job(&request)
            .await?;

        self.jobs
            .push(JobHandle::new(self.session.clone(), JobKind::Processing, &job_name));
        let job = self
            .jobs
            .last_mut()
            .ok_or_else(|| ClientError::InternalError("Submitted job was not recorded".into()))?;
        if options.wait {
            job.wait(options.logs).await?;
        }

        Ok(job.clone())
    }

    /// Names unnamed inputs and uploads local sources
    async fn normalize_inputs(
        &self,
        job_name: &str,
        inputs: Vec<ProcessingInput>,
    ) -> Result<Vec<ProcessingInput>> {
        let mut normalized = Vec::with_capacity(inputs.len());

        for (index, mut input) in inputs.into_iter().enumerate() {
            let name = input
                .input_name
                .clone()
                .unwrap_or_else(|| format!("input-{}", index + 1));

            if !is_s3_uri(&input.source) {
                let prefix = format!("{job_name}/input/{name}");
                input.source = self
                    .session
                    .upload_data(Path::new(&input.source), None, &prefix)
                    .await?;
            }

            input.input_name = Some(name);
            normalized.push(input);
        }

        Ok(normalized)
    }
}

/// Names unnamed outputs and fills in missing destinations
pub fn normalize_outputs(
    bucket: &str,
    job_name: &str,
    outputs: Vec<ProcessingOutput>,
) -> Result<Vec<ProcessingOutput>> {
    outputs
        .into_iter()
        .enumerate()
        .map(|(index, mut output)| {
            let name = output
                .output_name
                .clone()
                .unwrap_or_else(|| format!("output-{}", index + 1));

            match &output.destination {
                Some(destination) if !is_s3_uri(destination) => {
                    return Err(ClientError::validation(format!(
                        "Output destination must be an s3:// URI, got {destination}"
                    )));
                }
                Some(_) => {}
                None => {
                    let key = format!("{job_name}/output/{name}");
                    output.destination = Some(S3Uri::new(bucket, key).to_string());
                }
            }

            output.output_name = Some(name);
            Ok(output)
        })
        .collect()
}

/// Builds the `CreateProcessingJob` request from normalized channels
pub fn processing_request(
    config: &ProcessorConfig,
    job_name: &str,
    inputs: &[ProcessingInput],
    outputs: &[ProcessingOutput],
    arguments: Option<Vec<String>>,
    role_arn: String,
) -> CreateProcessingJobRequest {
    let processing_output_config = (!outputs.is_empty()).then(|| ProcessingOutputConfig {
        outputs: outputs.iter().map(ProcessingOutput::to_entry).collect(),
        kms_key_id: config.output_kms_key.clone(),
    });

    CreateProcessingJobRequest {
        processing_job_name: job_name.to_string(),
        processing_inputs: inputs.iter().map(ProcessingInput::to_config).collect(),
        processing_output_config,
        processing_resources: ProcessingResources {
            cluster_config: ClusterConfig {
                instance_count: config.instance_count,
                instance_type: config.instance_type.clone(),
                volume_size_in_gb: config.volume_size_in_gb,
                volume_kms_key_id: config.volume_kms_key.clone(),
            },
        },
        stopping_condition: config
            .max_runtime_in_seconds
            .map(|max_runtime_in_seconds| StoppingCondition {
                max_runtime_in_seconds,
            }),
        app_specification: AppSpecification {
            image_uri: config.image_uri.clone(),
            container_entrypoint: config.entrypoint.clone(),
            container_arguments: arguments,
        },
        environment: config.env.clone(),
        network_config: config.network_config.clone(),
        role_arn,
        tags: config.tags.clone(),
    }
}

// ============================================================================
// Script Processor
// ============================================================================

/// Processor that runs a user script with an interpreter command
#[derive(Debug, Clone)]
pub struct ScriptProcessor {
    processor: Processor,
    command: Vec<String>,
}

impl ScriptProcessor {
    /// # Arguments
    /// * `command` - Interpreter invocation the script path is appended to, e.g. `["python3"]`
    pub fn new(session: Session, config: ProcessorConfig, command: Vec<String>) -> Self {
        Self {
            processor: Processor::new(session, config),
            command,
        }
    }

    /// Script processor on the scikit-learn image for `framework_version`
    ///
    /// The image in `config` is replaced by the region's scikit-learn image;
    /// `command` defaults to `["python3"]`.
    pub fn sklearn(
        session: Session,
        framework_version: &str,
        mut config: ProcessorConfig,
        command: Option<Vec<String>>,
    ) -> Result<Self> {
        config.image_uri = sklearn_image_uri(framework_version, session.region())?;
        let command = command.unwrap_or_else(|| vec!["python3".to_string()]);
        Ok(Self::new(session, config, command))
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn latest_job(&self) -> Option<&JobHandle> {
        self.processor.latest_job()
    }

    /// Uploads `code` and runs it inside the container
    ///
    /// # Arguments
    /// * `code` - Local script path or `s3://` URI of the script
    /// * `inputs` - Additional inputs; the script is appended as input `code`
    /// * `outputs` - Output channels
    /// * `options` - Arguments, job name and wait behaviour
    pub async fn run(
        &mut self,
        code: &str,
        mut inputs: Vec<ProcessingInput>,
        outputs: Vec<ProcessingOutput>,
        mut options: RunOptions,
    ) -> Result<JobHandle> {
        let script_name = script_file_name(code)?;
        let job_name = options
            .job_name
            .clone()
            .unwrap_or_else(|| self.processor.config.job_name());

        let code_uri = if is_s3_uri(code) {
            code.to_string()
        } else {
            let prefix = format!("{job_name}/input/{CODE_INPUT_NAME}");
            self.processor
                .session
                .upload_data(Path::new(code), None, &prefix)
                .await?
        };

        inputs.push(ProcessingInput::new(code_uri, CODE_CONTAINER_DIR).with_name(CODE_INPUT_NAME));

        let mut entrypoint = self.command.clone();
        entrypoint.push(format!("{CODE_CONTAINER_DIR}{script_name}"));
        self.processor.config.entrypoint = Some(entrypoint);

        options.job_name = Some(job_name);
        self.processor.run(inputs, outputs, options).await
    }
}

fn script_file_name(code: &str) -> Result<String> {
    let name = code
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if name.is_empty() || code.ends_with('/') {
        return Err(ClientError::validation(format!(
            "code must point at a single file, got {code}"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ProcessorConfig {
        ProcessorConfig::new(
            "Role",
            "123.dkr.ecr.us-west-2.amazonaws.com/my-image:latest",
            1,
            "ml.m5.xlarge",
        )
    }

    #[test]
    fn test_outputs_get_names_and_destinations() {
        let outputs = normalize_outputs(
            "bucket",
            "job-1",
            vec![
                ProcessingOutput::new("/opt/ml/processing/output/a"),
                ProcessingOutput::new("/opt/ml/processing/output/b")
                    .with_name("report")
                    .with_destination("s3://other/report"),
            ],
        )
        .unwrap();

        assert_eq!(outputs[0].output_name.as_deref(), Some("output-1"));
        assert_eq!(
            outputs[0].destination.as_deref(),
            Some("s3://bucket/job-1/output/output-1")
        );
        assert_eq!(outputs[1].output_name.as_deref(), Some("report"));
        assert_eq!(outputs[1].destination.as_deref(), Some("s3://other/report"));
    }

    #[test]
    fn test_local_output_destination_rejected() {
        let err = normalize_outputs(
            "bucket",
            "job-1",
            vec![ProcessingOutput::new("/out").with_destination("/tmp/out")],
        )
        .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_request_without_outputs_omits_output_config() {
        let inputs = vec![
            ProcessingInput::new("s3://bucket/data", "/opt/ml/processing/input").with_name("data"),
        ];
        let request = processing_request(
            &config(),
            "job-1",
            &inputs,
            &[],
            None,
            "arn:aws:iam::1:role/Role".to_string(),
        );

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("ProcessingOutputConfig").is_none());
        assert!(value.get("StoppingCondition").is_none());
        assert_eq!(
            value["ProcessingInputs"][0],
            json!({
                "InputName": "data",
                "S3Input": {
                    "S3Uri": "s3://bucket/data",
                    "LocalPath": "/opt/ml/processing/input",
                    "S3DataType": "S3Prefix",
                    "S3InputMode": "File",
                    "S3DataDistributionType": "FullyReplicated"
                }
            })
        );
        assert_eq!(
            value["ProcessingResources"]["ClusterConfig"]["VolumeSizeInGB"],
            json!(30)
        );
    }

    #[test]
    fn test_request_with_outputs_carries_kms_key() {
        let mut config = config().with_max_runtime(600);
        config.output_kms_key = Some("key".to_string());
        let outputs = normalize_outputs("b", "j", vec![ProcessingOutput::new("/out")]).unwrap();

        let request = processing_request(&config, "j", &[], &outputs, Some(vec!["--x".into()]), "r".into());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["ProcessingOutputConfig"]["KmsKeyId"], json!("key"));
        assert_eq!(
            value["ProcessingOutputConfig"]["Outputs"][0]["S3Output"],
            json!({"S3Uri": "s3://b/j/output/output-1", "LocalPath": "/out", "S3UploadMode": "EndOfJob"})
        );
        assert_eq!(value["StoppingCondition"], json!({"MaxRuntimeInSeconds": 600}));
        assert_eq!(value["AppSpecification"]["ContainerArguments"], json!(["--x"]));
    }

    #[test]
    fn test_job_name_from_image() {
        let name = config().job_name();
        assert!(name.starts_with("my-image-"));
        assert!(name.len() <= MAX_JOB_NAME_LEN);
    }

    #[test]
    fn test_script_file_name() {
        assert_eq!(script_file_name("scripts/preprocess.py").unwrap(), "preprocess.py");
        assert_eq!(script_file_name("s3://b/code/run.py").unwrap(), "run.py");
        assert!(script_file_name("s3://b/code/").is_err());
    }
}
