//! Processing job DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dto::common::{ClusterConfig, NetworkConfig, S3Output, StoppingCondition, Tag};

/// Request to create a processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateProcessingJobRequest {
    pub processing_job_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processing_inputs: Vec<ProcessingInputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_output_config: Option<ProcessingOutputConfig>,
    pub processing_resources: ProcessingResources,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_condition: Option<StoppingCondition>,
    pub app_specification: AppSpecification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// A processing input as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingInputConfig {
    pub input_name: String,
    pub s3_input: S3Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Input {
    pub s3_uri: String,
    pub local_path: String,
    pub s3_data_type: String,
    pub s3_input_mode: String,
    pub s3_data_distribution_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_compression_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutputConfig {
    pub outputs: Vec<ProcessingOutputEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

/// A processing output as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingOutputEntry {
    pub output_name: String,
    pub s3_output: S3Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessingResources {
    pub cluster_config: ClusterConfig,
}

/// Container image and command of a processing job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppSpecification {
    pub image_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_entrypoint: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_arguments: Option<Vec<String>>,
}

/// Filters for listing processing jobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListJobsFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request_omits_optional_sections() {
        let req = CreateProcessingJobRequest {
            processing_job_name: "job-1".to_string(),
            processing_inputs: vec![],
            processing_output_config: None,
            processing_resources: ProcessingResources {
                cluster_config: ClusterConfig {
                    instance_count: 1,
                    instance_type: "ml.m4.xlarge".to_string(),
                    volume_size_in_gb: 30,
                    volume_kms_key_id: None,
                },
            },
            stopping_condition: Some(StoppingCondition {
                max_runtime_in_seconds: 3600,
            }),
            app_specification: AppSpecification {
                image_uri: "img".to_string(),
                container_entrypoint: None,
                container_arguments: None,
            },
            environment: None,
            network_config: None,
            role_arn: "arn:aws:iam::1:role/R".to_string(),
            tags: vec![],
        };

        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "ProcessingJobName": "job-1",
                "ProcessingResources": {
                    "ClusterConfig": {"InstanceCount": 1, "InstanceType": "ml.m4.xlarge", "VolumeSizeInGB": 30}
                },
                "StoppingCondition": {"MaxRuntimeInSeconds": 3600},
                "AppSpecification": {"ImageUri": "img"},
                "RoleArn": "arn:aws:iam::1:role/R"
            })
        );
    }
}
