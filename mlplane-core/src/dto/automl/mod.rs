//! AutoML job DTOs

use serde::{Deserialize, Serialize};

use crate::dto::common::{S3DataSource, Tag, VpcConfig};

/// Request to create an AutoML job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAutoMlJobRequest {
    #[serde(rename = "AutoMLJobName")]
    pub job_name: String,
    pub input_data_config: Vec<AutoMlChannel>,
    pub output_data_config: OutputDataConfig,
    #[serde(rename = "AutoMLJobConfig")]
    pub job_config: AutoMlJobConfig,
    pub role_arn: String,
    pub generate_candidate_definitions_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<ProblemType>,
    #[serde(
        rename = "AutoMLJobObjective",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub job_objective: Option<AutoMlJobObjective>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// One input channel of an AutoML job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoMlChannel {
    pub data_source: AutoMlDataSource,
    pub target_attribute_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoMlDataSource {
    pub s3_data_source: S3DataSource,
}

/// Where job artifacts are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    pub s3_output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoMlJobConfig {
    pub completion_criteria: CompletionCriteria,
    pub security_config: SecurityConfig,
}

/// Stopping condition of an AutoML search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionCriteria {
    pub max_candidates: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime_per_training_job_in_seconds: Option<u64>,
    #[serde(
        rename = "MaxAutoMLJobRuntimeInSeconds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_job_runtime_in_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityConfig {
    pub enable_inter_container_traffic_encryption: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_kms_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
}

/// Kind of supervised problem an AutoML job solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemType {
    Regression,
    BinaryClassification,
    MulticlassClassification,
}

/// Metric the AutoML search optimizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoMlJobObjective {
    pub metric_name: String,
}

impl AutoMlJobObjective {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
        }
    }
}

/// Sort key for candidate listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSortBy {
    CreationTime,
    Status,
    FinalObjectiveMetricValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Request to list the candidates of an AutoML job
///
/// Filters left as `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListCandidatesRequest {
    #[serde(rename = "AutoMLJobName")]
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_name_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_arn_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<CandidateSortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}
