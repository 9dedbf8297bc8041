//! Error types for the mlplane client

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the mlplane client
///
/// A remote job that ends in `Failed` is not an error: it is reported as a
/// status on the job's description.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The platform could not be reached or the connection broke
    #[error("Platform request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The platform answered with a non-success status
    #[error("Platform returned {status}: {message}")]
    ApiError { status: u16, message: String },

    /// A response or description did not have the expected shape
    #[error("Unexpected platform response: {0}")]
    ParseError(String),

    /// Job, schedule, endpoint or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller input rejected before any request was sent
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A derived result was asked for before the job produced it
    #[error("{resource} is not available for job {job_name}: {reason}")]
    NotYetAvailable {
        resource: String,
        job_name: String,
        reason: String,
    },

    /// Some deletions of a bulk delete failed
    #[error(
        "One or more {resource}s cannot be deleted, please retry. Failed {resource}s: {}",
        failed.join(", ")
    )]
    DeleteFailed {
        resource: String,
        failed: Vec<String>,
    },

    #[error("Timed out after {waited:?} waiting for {name}")]
    WaitTimedOut { name: String, waited: Duration },

    #[error("Wait for {name} was cancelled")]
    WaitCancelled { name: String },

    /// Endpoint deployment finished in the `Failed` state
    #[error("Endpoint {endpoint} failed: {reason}")]
    EndpointFailed { endpoint: String, reason: String },

    /// Payload could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client bug: {0}")]
    InternalError(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_yet_available(
        resource: impl Into<String>,
        job_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotYetAvailable {
            resource: resource.into(),
            job_name: job_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the named resource is missing, however the transport said so
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::ApiError { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// 4xx from the platform
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status: 400..=499, .. })
    }

    /// 5xx from the platform
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status: 500.., .. })
    }

    /// Whether the same request may succeed when sent again
    ///
    /// Server errors, throttling and connection-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            Self::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_failed_names_every_model() {
        let err = ClientError::DeleteFailed {
            resource: "model".to_string(),
            failed: vec!["m1".to_string(), "m3".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "One or more models cannot be deleted, please retry. Failed models: m1, m3"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(ClientError::api_error(404, "missing").is_not_found());
        assert!(ClientError::api_error(400, "bad").is_client_error());
        assert!(ClientError::api_error(503, "busy").is_server_error());
        assert!(ClientError::api_error(503, "busy").is_retryable());
        assert!(ClientError::api_error(429, "slow down").is_retryable());
        assert!(!ClientError::api_error(400, "bad").is_retryable());
        assert!(!ClientError::validation("x").is_retryable());
    }
}
