//! Monitoring result files
//!
//! Baselining and monitoring jobs write JSON documents to blob storage. Each
//! wrapper keeps the parsed body together with the URI it came from so that
//! edits can be saved back in place.

use serde_json::{Value, json};
use std::path::Path;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::naming::unique_name_from_base;
use crate::s3::{S3Uri, s3_path_join};
use crate::session::Session;

pub const STATISTICS_FILE_NAME: &str = "statistics.json";
pub const CONSTRAINTS_FILE_NAME: &str = "constraints.json";
pub const CONSTRAINT_VIOLATIONS_FILE_NAME: &str = "constraint_violations.json";

const LOCAL_FILES_PREFIX: &str = "model-monitor/files";

/// JSON document stored at a blob storage URI
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringFile {
    body: Value,
    file_s3_uri: String,
}

impl MonitoringFile {
    pub fn new(body: Value, file_s3_uri: impl Into<String>) -> Self {
        Self {
            body,
            file_s3_uri: file_s3_uri.into(),
        }
    }

    /// Reads and parses the document at `uri`
    pub async fn from_s3_uri(session: &Session, uri: &str) -> Result<Self> {
        let text = session.read_string(uri).await?;
        let body = serde_json::from_str(&text)
            .map_err(|e| ClientError::ParseError(format!("{uri} is not valid JSON: {e}")))?;
        Ok(Self::new(body, uri))
    }

    /// Uploads a local JSON file to the default bucket and parses it
    pub async fn from_file_path(session: &Session, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            ClientError::ParseError(format!("{} is not valid JSON: {e}", path.display()))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::validation(format!("{} has no file name", path.display())))?;
        let upload_id = unique_name_from_base("upload", 63);
        let prefix = s3_path_join([LOCAL_FILES_PREFIX, upload_id.as_str(), file_name.as_str()]);
        let uri = S3Uri::new(session.default_bucket(), prefix).to_string();

        session.upload_string(&text, &uri).await?;
        Ok(Self::new(body, uri))
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    pub fn file_s3_uri(&self) -> &str {
        &self.file_s3_uri
    }

    /// Writes the body back to its URI
    pub async fn save(&self, session: &Session) -> Result<()> {
        let text = serde_json::to_string(&self.body)
            .map_err(|e| ClientError::InternalError(e.to_string()))?;
        session.upload_string(&text, &self.file_s3_uri).await?;
        info!(uri = %self.file_s3_uri, "Saved monitoring file");
        Ok(())
    }

    /// Writes the body to a new URI, which becomes the file's location
    pub async fn save_to(&mut self, session: &Session, uri: impl Into<String>) -> Result<()> {
        self.file_s3_uri = uri.into();
        self.save(session).await
    }
}

macro_rules! monitoring_file {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(MonitoringFile);

        impl $name {
            pub fn new(body: Value, file_s3_uri: impl Into<String>) -> Self {
                Self(MonitoringFile::new(body, file_s3_uri))
            }

            pub async fn from_s3_uri(session: &Session, uri: &str) -> Result<Self> {
                MonitoringFile::from_s3_uri(session, uri).await.map(Self)
            }

            pub async fn from_file_path(session: &Session, path: impl AsRef<Path>) -> Result<Self> {
                MonitoringFile::from_file_path(session, path).await.map(Self)
            }

            pub fn body(&self) -> &Value {
                self.0.body()
            }

            pub fn body_mut(&mut self) -> &mut Value {
                self.0.body_mut()
            }

            pub fn file_s3_uri(&self) -> &str {
                self.0.file_s3_uri()
            }

            pub async fn save(&self, session: &Session) -> Result<()> {
                self.0.save(session).await
            }

            pub async fn save_to(&mut self, session: &Session, uri: impl Into<String>) -> Result<()> {
                self.0.save_to(session, uri).await
            }
        }
    };
}

monitoring_file!(
    /// Dataset statistics computed by a baselining or monitoring job
    Statistics
);

monitoring_file!(
    /// Constraints suggested by a baselining job
    Constraints
);

monitoring_file!(
    /// Violations found by a monitoring execution
    ConstraintViolations
);

impl Constraints {
    /// Turns constraint evaluation on or off for the whole dataset
    pub fn set_monitoring(&mut self, enabled: bool) {
        let flag = evaluate_flag(enabled);
        let body = self.body_mut();
        if !body.is_object() {
            *body = json!({});
        }
        match body.get_mut("monitoring_config") {
            Some(Value::Object(config)) => {
                config.insert("evaluate_constraints".to_string(), flag);
            }
            _ => {
                body["monitoring_config"] = json!({ "evaluate_constraints": flag });
            }
        }
    }

    /// Turns constraint evaluation on or off for one feature
    ///
    /// Returns whether a feature with that name exists.
    pub fn set_feature_monitoring(&mut self, feature_name: &str, enabled: bool) -> bool {
        let Some(features) = self
            .body_mut()
            .get_mut("features")
            .and_then(Value::as_array_mut)
        else {
            return false;
        };

        let mut found = false;
        for feature in features
            .iter_mut()
            .filter(|f| f.get("name").and_then(Value::as_str) == Some(feature_name))
        {
            match feature.get_mut("monitoringConfigOverrides") {
                Some(Value::Object(overrides)) => {
                    overrides.insert("evaluateConstraints".to_string(), evaluate_flag(enabled));
                }
                _ => {
                    feature["monitoringConfigOverrides"] =
                        json!({ "evaluateConstraints": evaluate_flag(enabled) });
                }
            }
            found = true;
        }
        found
    }
}

fn evaluate_flag(enabled: bool) -> Value {
    Value::from(if enabled { "Enabled" } else { "Disabled" })
}
