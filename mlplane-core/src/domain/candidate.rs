//! AutoML candidate types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A model candidate produced by an AutoML job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Candidate {
    pub candidate_name: String,
    #[serde(default)]
    pub inference_containers: Vec<InferenceContainer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_status: Option<String>,
    #[serde(
        rename = "FinalAutoMLJobObjectiveMetric",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_objective_metric: Option<ObjectiveMetric>,
    /// Fields the client does not model explicitly
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One container of a candidate's inference pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InferenceContainer {
    pub image: String,
    pub model_data_url: String,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

/// Final objective metric reached by a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectiveMetric {
    pub metric_name: String,
    pub value: f64,
    #[serde(default, rename = "Type", skip_serializing_if = "Option::is_none")]
    pub objective_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_keeps_unmodelled_fields() {
        let raw = json!({
            "CandidateName": "tuning-job-1-abc-042",
            "CandidateStatus": "Completed",
            "InferenceContainers": [
                {"Image": "img:1", "ModelDataUrl": "s3://b/model.tar.gz", "Environment": {"A": "1"}}
            ],
            "FinalAutoMLJobObjectiveMetric": {"MetricName": "validation:accuracy", "Value": 0.91},
            "CandidateSteps": [{"CandidateStepType": "AWS::SageMaker::TrainingJob"}]
        });

        let candidate: Candidate = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(candidate.inference_containers.len(), 1);
        assert_eq!(candidate.inference_containers[0].environment["A"], "1");
        assert!(candidate.extra.contains_key("CandidateSteps"));

        assert_eq!(serde_json::to_value(&candidate).unwrap(), raw);
    }
}
