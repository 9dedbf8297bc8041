//! Container image URIs for platform-provided images

use crate::error::{ClientError, Result};

const MONITOR_ANALYZER_REPOSITORY: &str = "sagemaker-model-monitor-analyzer";
const SKLEARN_REPOSITORY: &str = "sagemaker-scikit-learn";

/// Registry accounts hosting the model monitor analyzer, per region
const MONITOR_ANALYZER_ACCOUNTS: &[(&str, &str)] = &[
    ("us-east-1", "156813124566"),
    ("us-east-2", "777275614652"),
    ("us-west-1", "890145073186"),
    ("us-west-2", "159807026194"),
    ("eu-west-1", "468650794304"),
    ("eu-central-1", "048819808253"),
    ("ap-northeast-1", "574779866223"),
    ("ap-southeast-2", "563025443158"),
];

/// Registry accounts hosting the scikit-learn framework images, per region
const SKLEARN_ACCOUNTS: &[(&str, &str)] = &[
    ("us-east-1", "683313688378"),
    ("us-east-2", "257758044811"),
    ("us-west-1", "746614075791"),
    ("us-west-2", "246618743249"),
    ("eu-west-1", "141502667606"),
    ("eu-central-1", "492215442770"),
    ("ap-northeast-1", "354813040037"),
    ("ap-southeast-2", "783357654285"),
];

fn registry(accounts: &[(&str, &str)], repository: &str, region: &str) -> Result<String> {
    accounts
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, account)| format!("{account}.dkr.ecr.{region}.amazonaws.com/{repository}"))
        .ok_or_else(|| {
            ClientError::validation(format!(
                "No {repository} image is published in region {region}"
            ))
        })
}

/// Default model monitor analyzer image for `region`
pub fn default_monitor_image_uri(region: &str) -> Result<String> {
    registry(MONITOR_ANALYZER_ACCOUNTS, MONITOR_ANALYZER_REPOSITORY, region)
}

/// Whether `image_uri` points at the default analyzer in any region
pub fn is_default_monitor_image(image_uri: &str) -> bool {
    image_uri
        .split(':')
        .next()
        .is_some_and(|repo| repo.ends_with(&format!("/{MONITOR_ANALYZER_REPOSITORY}")))
}

/// Scikit-learn processing image for `framework_version` in `region`
///
/// # Arguments
/// * `framework_version` - Framework version such as `0.20.0`
/// * `region` - Platform region
pub fn sklearn_image_uri(framework_version: &str, region: &str) -> Result<String> {
    if framework_version.trim().is_empty() {
        return Err(ClientError::validation(
            "framework_version is required for the scikit-learn image",
        ));
    }
    let repository = registry(SKLEARN_ACCOUNTS, SKLEARN_REPOSITORY, region)?;
    Ok(format!("{repository}:{framework_version}-cpu-py3"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_monitor_image() {
        assert_eq!(
            default_monitor_image_uri("us-west-2").unwrap(),
            "159807026194.dkr.ecr.us-west-2.amazonaws.com/sagemaker-model-monitor-analyzer"
        );
        assert!(is_default_monitor_image(
            &default_monitor_image_uri("eu-west-1").unwrap()
        ));
        assert!(!is_default_monitor_image("123.dkr.ecr.us-west-2.amazonaws.com/custom:1"));
    }

    #[test]
    fn test_sklearn_image() {
        assert_eq!(
            sklearn_image_uri("0.20.0", "us-east-1").unwrap(),
            "683313688378.dkr.ecr.us-east-1.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3"
        );
    }

    #[test]
    fn test_unknown_region_rejected() {
        assert!(matches!(
            default_monitor_image_uri("mars-north-1"),
            Err(ClientError::Validation(_))
        ));
        assert!(sklearn_image_uri("0.20.0", "mars-north-1").is_err());
    }
}
