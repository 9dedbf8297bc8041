//! Blob storage locations
//!
//! Objects are addressed as `s3://bucket/key`.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{ClientError, Result};

/// A parsed `s3://bucket/key` location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into().trim_start_matches('/').to_string(),
        }
    }

    /// Parses a storage URI
    ///
    /// # Arguments
    /// * `uri` - Location of the form `s3://bucket/key`
    ///
    /// # Returns
    /// The bucket and key, or a validation error for any other scheme
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| ClientError::validation(format!("Invalid storage URI {uri}: {e}")))?;

        if url.scheme() != "s3" {
            return Err(ClientError::validation(format!(
                "Expecting 's3' scheme, got: {} in {uri}",
                url.scheme()
            )));
        }

        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::validation(format!("Missing bucket in {uri}")))?;

        Ok(Self::new(bucket, url.path()))
    }

    /// Appends path segments to the key, separated by `/`
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        let key = if self.key.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.key.trim_end_matches('/'), segment)
        };
        Self::new(self.bucket.clone(), key)
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl FromStr for S3Uri {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether a location already lives in blob storage
pub fn is_s3_uri(location: &str) -> bool {
    location.starts_with("s3://")
}

/// Joins URI fragments with single slashes
pub fn s3_path_join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for part in parts {
        let part = part.as_ref();
        if out.is_empty() {
            out.push_str(part.trim_end_matches('/'));
        } else {
            let part = part.trim_matches('/');
            if !part.is_empty() {
                out.push('/');
                out.push_str(part);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_key() {
        let uri = S3Uri::parse("s3://bucket/some/prefix/file.csv").unwrap();
        assert_eq!(uri.bucket, "bucket");
        assert_eq!(uri.key, "some/prefix/file.csv");
        assert_eq!(uri.to_string(), "s3://bucket/some/prefix/file.csv");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(S3Uri::parse("https://bucket/key").is_err());
        assert!(S3Uri::parse("not a uri").is_err());
    }

    #[test]
    fn test_join() {
        let uri = S3Uri::parse("s3://bucket/job/").unwrap();
        assert_eq!(uri.join("output/stats").to_string(), "s3://bucket/job/output/stats");
        assert_eq!(
            s3_path_join(["s3://bucket/", "/job/", "statistics.json"]),
            "s3://bucket/job/statistics.json"
        );
    }
}
