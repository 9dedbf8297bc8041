//! Real-time endpoint predictor
//!
//! A [`Predictor`] invokes a deployed endpoint with a configured serializer
//! and deserializer, and manages the endpoint's lifecycle: deletion of the
//! endpoint and its models, data capture updates, and the monitors attached
//! to it.

use tracing::{debug, info, warn};

use mlplane_core::domain::description::Description;
use mlplane_core::domain::endpoint::{EndpointStatus, ProductionVariant};
use mlplane_core::dto::common::Tag;
use mlplane_core::dto::endpoint::{
    CaptureContentTypeHeader, CaptureMode, CaptureOption, CreateEndpointConfigRequest,
    DataCaptureConfig, EndpointRequest,
};

use crate::codec::{Deserializer, Payload, Serializer};
use crate::error::{ClientError, Result};
use crate::monitor::ModelMonitor;
use crate::naming::name_from_base;
use crate::polling::{Poller, WaitOptions};
use crate::s3::S3Uri;
use crate::session::{InvokeRequest, Session};

const MAX_CONFIG_NAME_LEN: usize = 63;
const DEFAULT_SAMPLING_PERCENTAGE: u32 = 20;
const DATA_CAPTURE_PREFIX: &str = "model-monitor/data-capture";

// ============================================================================
// Data Capture
// ============================================================================

/// Data capture settings of an endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCapture {
    pub enable_capture: bool,
    pub sampling_percentage: u32,
    /// Defaults to `s3://<default bucket>/model-monitor/data-capture`
    pub destination_s3_uri: Option<String>,
    pub kms_key_id: Option<String>,
    pub capture_options: Vec<CaptureMode>,
    pub csv_content_types: Vec<String>,
    pub json_content_types: Vec<String>,
}

impl Default for DataCapture {
    fn default() -> Self {
        Self {
            enable_capture: true,
            sampling_percentage: DEFAULT_SAMPLING_PERCENTAGE,
            destination_s3_uri: None,
            kms_key_id: None,
            capture_options: vec![CaptureMode::Input, CaptureMode::Output],
            csv_content_types: vec!["text/csv".to_string()],
            json_content_types: vec!["application/json".to_string()],
        }
    }
}

impl DataCapture {
    pub fn disabled() -> Self {
        Self {
            enable_capture: false,
            ..Self::default()
        }
    }

    /// Request form, resolving the default destination against `session`
    pub fn to_request(&self, session: &Session) -> DataCaptureConfig {
        let destination_s3_uri = self.destination_s3_uri.clone().unwrap_or_else(|| {
            S3Uri::new(session.default_bucket(), DATA_CAPTURE_PREFIX).to_string()
        });

        DataCaptureConfig {
            enable_capture: self.enable_capture,
            initial_sampling_percentage: self.sampling_percentage,
            destination_s3_uri,
            kms_key_id: self.kms_key_id.clone(),
            capture_options: self
                .capture_options
                .iter()
                .map(|&capture_mode| CaptureOption { capture_mode })
                .collect(),
            capture_content_type_header: CaptureContentTypeHeader {
                csv_content_types: self.csv_content_types.clone(),
                json_content_types: self.json_content_types.clone(),
            },
        }
    }
}

// ============================================================================
// Predictor
// ============================================================================

/// Per-call overrides for [`Predictor::predict_with`]
#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

/// Client for one deployed endpoint
#[derive(Debug, Clone)]
pub struct Predictor {
    session: Session,
    endpoint_name: String,
    serializer: Serializer,
    deserializer: Deserializer,
    content_type: Option<String>,
    accept: Option<String>,
}

impl Predictor {
    /// Predictor sending raw bytes and returning raw bytes
    pub fn new(session: Session, endpoint_name: impl Into<String>) -> Self {
        Self {
            session,
            endpoint_name: endpoint_name.into(),
            serializer: Serializer::default(),
            deserializer: Deserializer::default(),
            content_type: None,
            accept: None,
        }
    }

    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_deserializer(mut self, deserializer: Deserializer) -> Self {
        self.deserializer = deserializer;
        self
    }

    /// Overrides the serializer's content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Overrides the deserializer's accept type
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or_else(|| self.serializer.content_type())
    }

    pub fn accept(&self) -> &str {
        self.accept
            .as_deref()
            .unwrap_or_else(|| self.deserializer.accept())
    }

    /// Invokes the endpoint
    pub async fn predict(&self, data: impl Into<Payload>) -> Result<Payload> {
        self.predict_with(data, PredictOptions::default()).await
    }

    /// Invokes the endpoint with per-call content negotiation
    ///
    /// # Arguments
    /// * `data` - Request payload, encoded with the predictor's serializer
    /// * `options` - Content and accept types that win over the predictor's
    ///
    /// # Returns
    /// The response decoded with the predictor's deserializer
    pub async fn predict_with(
        &self,
        data: impl Into<Payload>,
        options: PredictOptions,
    ) -> Result<Payload> {
        let body = self.serializer.encode(&data.into())?;
        let request = InvokeRequest {
            endpoint_name: self.endpoint_name.clone(),
            body,
            content_type: Some(
                options
                    .content_type
                    .unwrap_or_else(|| self.content_type().to_string()),
            ),
            accept: Some(options.accept.unwrap_or_else(|| self.accept().to_string())),
        };

        debug!(
            endpoint = %self.endpoint_name,
            bytes = request.body.len(),
            content_type = ?request.content_type,
            "Invoking endpoint"
        );
        let response = self.session.runtime().invoke_endpoint(&request).await?;
        self.deserializer
            .decode(response.body, response.content_type.as_deref())
    }

    // =============================================================================
    // Endpoint Resources
    // =============================================================================

    /// Name of the endpoint configuration the endpoint currently uses
    pub async fn endpoint_config_name(&self) -> Result<String> {
        let description = self
            .session
            .control()
            .describe_endpoint(&self.endpoint_name)
            .await?;
        description
            .str_at("EndpointConfigName")
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::ParseError(format!(
                    "Endpoint {} has no EndpointConfigName",
                    self.endpoint_name
                ))
            })
    }

    /// Names of the models behind the endpoint
    pub async fn model_names(&self) -> Result<Vec<String>> {
        let config_name = self.endpoint_config_name().await?;
        let config = self
            .session
            .control()
            .describe_endpoint_config(&config_name)
            .await?;
        Ok(production_variants(&config)?
            .into_iter()
            .map(|v| v.model_name)
            .collect())
    }

    /// Deletes the endpoint, and its configuration when `delete_config` is set
    pub async fn delete_endpoint(&self, delete_config: bool) -> Result<()> {
        if delete_config {
            let config_name = self.endpoint_config_name().await?;
            info!(endpoint_config = %config_name, "Deleting endpoint config");
            self.session
                .control()
                .delete_endpoint_config(&config_name)
                .await?;
        }

        info!(endpoint = %self.endpoint_name, "Deleting endpoint");
        self.session
            .control()
            .delete_endpoint(&self.endpoint_name)
            .await
    }

    /// Deletes every model behind the endpoint
    ///
    /// Every deletion is attempted. When some fail, one error names all of
    /// them.
    pub async fn delete_model(&self) -> Result<()> {
        let model_names = self.model_names().await?;
        let mut failed = Vec::new();

        for model_name in model_names {
            match self.session.control().delete_model(&model_name).await {
                Ok(()) => info!(model = %model_name, "Deleted model"),
                Err(e) => {
                    warn!(model = %model_name, error = %e, "Failed to delete model");
                    failed.push(model_name);
                }
            }
        }

        if !failed.is_empty() {
            return Err(ClientError::DeleteFailed {
                resource: "model".to_string(),
                failed,
            });
        }
        Ok(())
    }

    // =============================================================================
    // Data Capture
    // =============================================================================

    /// Turns data capture on with default settings
    pub async fn enable_data_capture(&self) -> Result<()> {
        self.update_data_capture_config(Some(DataCapture::default()))
            .await
    }

    pub async fn disable_data_capture(&self) -> Result<()> {
        self.update_data_capture_config(Some(DataCapture::disabled()))
            .await
    }

    /// Replaces the endpoint's data capture settings
    ///
    /// The current endpoint configuration is copied under a new name with the
    /// data capture section swapped, then the endpoint is updated to use it
    /// and waited on until it is back in service. `None` removes the section.
    pub async fn update_data_capture_config(&self, data_capture: Option<DataCapture>) -> Result<()> {
        let current_name = self.endpoint_config_name().await?;
        let current = self
            .session
            .control()
            .describe_endpoint_config(&current_name)
            .await?;

        let new_name = name_from_base(&self.endpoint_name, MAX_CONFIG_NAME_LEN);
        let tags: Vec<Tag> = match current.decode_at::<Vec<Tag>>("Tags") {
            Some(Ok(tags)) => tags,
            _ => Vec::new(),
        };

        let request = CreateEndpointConfigRequest {
            endpoint_config_name: new_name.clone(),
            production_variants: production_variants(&current)?,
            data_capture_config: data_capture.map(|d| d.to_request(&self.session)),
            kms_key_id: current.str_at("KmsKeyId").map(str::to_string),
            tags,
        };

        info!(
            endpoint = %self.endpoint_name,
            from = %current_name,
            to = %new_name,
            capture = ?request.data_capture_config.as_ref().map(|d| d.enable_capture),
            "Updating data capture config"
        );
        self.session
            .control()
            .create_endpoint_config(&request)
            .await?;
        self.session
            .control()
            .update_endpoint(&EndpointRequest {
                endpoint_name: self.endpoint_name.clone(),
                endpoint_config_name: new_name,
                tags: Vec::new(),
            })
            .await?;

        wait_for_endpoint(&self.session, &self.endpoint_name, WaitOptions::default()).await?;
        Ok(())
    }

    /// Monitors scheduled against this endpoint
    pub async fn list_monitors(&self) -> Result<Vec<ModelMonitor>> {
        let schedules = self
            .session
            .control()
            .list_monitoring_schedules(Some(&self.endpoint_name))
            .await?;

        if schedules.is_empty() {
            debug!(endpoint = %self.endpoint_name, "No monitoring schedules found");
        }

        let mut monitors = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            monitors.push(
                ModelMonitor::attach(self.session.clone(), &schedule.monitoring_schedule_name)
                    .await?,
            );
        }
        Ok(monitors)
    }
}

fn production_variants(config: &Description) -> Result<Vec<ProductionVariant>> {
    match config.decode_at::<Vec<ProductionVariant>>("ProductionVariants") {
        Some(Ok(variants)) => Ok(variants),
        Some(Err(e)) => Err(ClientError::ParseError(format!(
            "Invalid ProductionVariants: {e}"
        ))),
        None => Err(ClientError::ParseError(
            "Endpoint config has no ProductionVariants".to_string(),
        )),
    }
}

/// Polls an endpoint until it leaves its transitional states
///
/// # Returns
/// The description once the endpoint is `InService`. An endpoint that ends
/// up `Failed` yields [`ClientError::EndpointFailed`].
pub async fn wait_for_endpoint(
    session: &Session,
    endpoint_name: &str,
    options: WaitOptions,
) -> Result<Description> {
    let mut poller = Poller::new(endpoint_name, session.config().poll_interval, options);

    loop {
        let description = session.control().describe_endpoint(endpoint_name).await?;
        let status = match description.decode_at::<EndpointStatus>("EndpointStatus") {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                return Err(ClientError::ParseError(format!("Invalid EndpointStatus: {e}")));
            }
            None => {
                return Err(ClientError::ParseError(format!(
                    "Endpoint {endpoint_name} has no EndpointStatus"
                )));
            }
        };

        match status {
            EndpointStatus::InService => {
                info!(endpoint = %endpoint_name, polls = poller.polls(), "Endpoint in service");
                return Ok(description);
            }
            EndpointStatus::Failed => {
                let reason = description
                    .str_at("FailureReason")
                    .unwrap_or("unknown")
                    .to_string();
                return Err(ClientError::EndpointFailed {
                    endpoint: endpoint_name.to_string(),
                    reason,
                });
            }
            status => debug!(endpoint = %endpoint_name, %status, "Endpoint not ready"),
        }

        poller.tick().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_production_variants_required() {
        let config = Description::from_value(json!({"EndpointConfigName": "c"})).unwrap();
        assert!(matches!(
            production_variants(&config),
            Err(ClientError::ParseError(_))
        ));

        let config = Description::from_value(json!({
            "ProductionVariants": [{
                "VariantName": "AllTraffic",
                "ModelName": "m-1",
                "InitialInstanceCount": 1,
                "InstanceType": "ml.m5.large"
            }]
        }))
        .unwrap();
        let variants = production_variants(&config).unwrap();
        assert_eq!(variants[0].model_name, "m-1");
        assert_eq!(variants[0].initial_variant_weight, 1.0);
    }

    #[test]
    fn test_data_capture_defaults() {
        let capture = DataCapture::default();
        assert!(capture.enable_capture);
        assert_eq!(capture.sampling_percentage, 20);
        assert_eq!(
            capture.capture_options,
            vec![CaptureMode::Input, CaptureMode::Output]
        );
        assert!(!DataCapture::disabled().enable_capture);
    }
}
