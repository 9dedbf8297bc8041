//! Monitoring schedule DTOs
//!
//! These types are also deserialized from schedule descriptions so that an
//! update can start from the configuration the platform currently holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dto::common::{ClusterConfig, NetworkConfig, S3Output, StoppingCondition, Tag};

/// Request to create a monitoring schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateMonitoringScheduleRequest {
    pub monitoring_schedule_name: String,
    pub monitoring_schedule_config: MonitoringScheduleConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Request to replace the configuration of an existing schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateMonitoringScheduleRequest {
    pub monitoring_schedule_name: String,
    pub monitoring_schedule_config: MonitoringScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringScheduleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_config: Option<ScheduleConfig>,
    pub monitoring_job_definition: MonitoringJobDefinition,
}

/// Cron trigger of a schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleConfig {
    pub schedule_expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringJobDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_config: Option<BaselineConfig>,
    pub monitoring_inputs: Vec<MonitoringInput>,
    pub monitoring_output_config: MonitoringOutputConfig,
    pub monitoring_resources: MonitoringResources,
    pub monitoring_app_specification: MonitoringAppSpecification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_condition: Option<StoppingCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
    pub role_arn: String,
}

/// Baseline artifacts executions compare against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaselineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_resource: Option<S3Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics_resource: Option<S3Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Resource {
    pub s3_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringInput {
    pub endpoint_input: EndpointInput,
}

/// Captured endpoint traffic fed to a monitoring execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointInput {
    pub endpoint_name: String,
    pub local_path: String,
    pub s3_input_mode: String,
    pub s3_data_distribution_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringOutputConfig {
    pub monitoring_outputs: Vec<MonitoringOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringOutput {
    pub s3_output: S3Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringResources {
    pub cluster_config: ClusterConfig,
}

/// Analyzer container of a monitoring execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringAppSpecification {
    pub image_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_entrypoint: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_arguments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_preprocessor_source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_analytics_processor_source_uri: Option<String>,
}
