//! Client configuration
//!
//! Connection settings for the three platform services plus the polling
//! and retry knobs shared by every handle created from a session.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control-plane base URL (e.g., "http://localhost:8080")
    pub endpoint_url: String,

    /// Blob storage base URL, defaults to the control-plane URL
    pub storage_url: String,

    /// Inference runtime base URL, defaults to the control-plane URL
    pub runtime_url: String,

    pub region: String,

    /// Bucket used for staged inputs and default outputs
    pub default_bucket: Option<String>,

    pub account_id: Option<String>,

    /// Delay between two describe calls while waiting on a job
    pub poll_interval: Duration,

    /// Per-request timeout of the HTTP transport
    pub request_timeout: Duration,

    /// Attempts made for idempotent calls before giving up
    pub max_retries: u32,
}

impl ClientConfig {
    /// Creates a new configuration with defaults
    pub fn new(endpoint_url: impl Into<String>, region: impl Into<String>) -> Self {
        let endpoint_url = endpoint_url.into();
        Self {
            storage_url: endpoint_url.clone(),
            runtime_url: endpoint_url.clone(),
            endpoint_url,
            region: region.into(),
            default_bucket: None,
            account_id: None,
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - MLPLANE_ENDPOINT_URL (required)
    /// - MLPLANE_STORAGE_URL (optional, default: endpoint URL)
    /// - MLPLANE_RUNTIME_URL (optional, default: endpoint URL)
    /// - MLPLANE_REGION (optional, default: us-west-2)
    /// - MLPLANE_DEFAULT_BUCKET (optional)
    /// - MLPLANE_ACCOUNT_ID (optional)
    /// - MLPLANE_POLL_INTERVAL (optional, seconds, default: 5)
    /// - MLPLANE_REQUEST_TIMEOUT (optional, seconds, default: 60)
    /// - MLPLANE_MAX_RETRIES (optional, default: 3)
    pub fn from_env() -> Result<Self> {
        let endpoint_url = std::env::var("MLPLANE_ENDPOINT_URL").map_err(|_| {
            ClientError::validation("MLPLANE_ENDPOINT_URL environment variable not set")
        })?;

        let region = std::env::var("MLPLANE_REGION").unwrap_or_else(|_| "us-west-2".to_string());

        let mut config = Self::new(endpoint_url, region);

        if let Ok(url) = std::env::var("MLPLANE_STORAGE_URL") {
            config.storage_url = url;
        }

        if let Ok(url) = std::env::var("MLPLANE_RUNTIME_URL") {
            config.runtime_url = url;
        }

        config.default_bucket = std::env::var("MLPLANE_DEFAULT_BUCKET").ok();
        config.account_id = std::env::var("MLPLANE_ACCOUNT_ID").ok();

        if let Some(secs) = env_parse::<u64>("MLPLANE_POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("MLPLANE_REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(retries) = env_parse::<u32>("MLPLANE_MAX_RETRIES") {
            config.max_retries = retries;
        }

        Ok(config)
    }

    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bucket for staged data
    ///
    /// Falls back to `mlplane-<region>-<account>` when no bucket is set.
    pub fn default_bucket(&self) -> String {
        match &self.default_bucket {
            Some(bucket) => bucket.clone(),
            None => format!(
                "mlplane-{}-{}",
                self.region,
                self.account_id.as_deref().unwrap_or("default")
            ),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("endpoint_url", &self.endpoint_url),
            ("storage_url", &self.storage_url),
            ("runtime_url", &self.runtime_url),
        ] {
            if url.is_empty() {
                return Err(ClientError::validation(format!("{name} cannot be empty")));
            }

            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ClientError::validation(format!(
                    "{name} must start with http:// or https://"
                )));
            }
        }

        if self.region.is_empty() {
            return Err(ClientError::validation("region cannot be empty"));
        }

        if self.poll_interval.is_zero() {
            return Err(ClientError::validation(
                "poll_interval must be greater than 0",
            ));
        }

        if self.max_retries == 0 {
            return Err(ClientError::validation("max_retries must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080", "us-west-2")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.storage_url, "http://localhost:8080");
        assert_eq!(config.runtime_url, "http://localhost:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.endpoint_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.endpoint_url = "http://localhost:8080".to_string();
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.poll_interval = Duration::from_millis(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_bucket_fallback() {
        let config = ClientConfig::new("http://localhost:8080", "eu-west-1").with_account_id("123");
        assert_eq!(config.default_bucket(), "mlplane-eu-west-1-123");

        let config = config.with_default_bucket("my-bucket");
        assert_eq!(config.default_bucket(), "my-bucket");
    }
}
