//! Job and resource name generation

use chrono::Utc;
use uuid::Uuid;

/// Appends a millisecond timestamp to `base`
///
/// The base is truncated so the result never exceeds `max_len` characters.
/// Timestamps have the form `YYYY-MM-DD-HH-MM-SS-mmm`.
pub fn name_from_base(base: &str, max_len: usize) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S-%3f").to_string();
    with_suffix(base, &timestamp, max_len)
}

/// Appends a short random suffix to `base`
pub fn unique_name_from_base(base: &str, max_len: usize) -> String {
    let id = Uuid::new_v4().simple().to_string();
    with_suffix(base, &id[..8], max_len)
}

/// Derives a base job name from a container image URI
///
/// `123.dkr.ecr.us-west-2.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3`
/// becomes `sagemaker-scikit-learn`.
pub fn base_name_from_image(image: &str) -> String {
    let repo = image.rsplit('/').next().unwrap_or(image);
    let name = repo.split(':').next().unwrap_or(repo);
    name.to_string()
}

fn with_suffix(base: &str, suffix: &str, max_len: usize) -> String {
    let keep = max_len.saturating_sub(suffix.len() + 1);
    let base: String = base.chars().take(keep).collect();
    format!("{}-{}", base.trim_end_matches('-'), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_base_respects_max_len() {
        let name = name_from_base("automl-with-a-rather-long-base-name", 32);
        assert_eq!(name.len(), 32);
        assert!(name.starts_with("automl-"));
    }

    #[test]
    fn test_name_from_base_keeps_short_base() {
        let name = name_from_base("job", 63);
        assert!(name.starts_with("job-"));
        assert_eq!(name.len(), "job-".len() + "2024-01-01-00-00-00-000".len());
    }

    #[test]
    fn test_unique_names_differ() {
        assert_ne!(
            unique_name_from_base("model", 63),
            unique_name_from_base("model", 63)
        );
    }

    #[test]
    fn test_base_name_from_image() {
        assert_eq!(
            base_name_from_image("1.dkr.ecr.us-west-2.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3"),
            "sagemaker-scikit-learn"
        );
        assert_eq!(base_name_from_image("analyzer"), "analyzer");
    }
}
