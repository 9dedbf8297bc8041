//! mlplane Client
//!
//! An async client SDK for a managed machine-learning platform.
//!
//! The platform is reached through a [`Session`], which bundles the control
//! plane, blob storage and inference runtime with the client configuration.
//! On top of it the crate provides:
//! - AutoML jobs: submit, inspect candidates, deploy the best one
//! - Processing jobs: run containers or scripts over stored data
//! - Model monitoring: baselines, schedules and their reports
//! - Predictors: invoke endpoints with pluggable payload codecs
//! - Job handles: describe, wait with optional timeout or cancellation, stop
//!
//! # Example
//!
//! ```no_run
//! use mlplane_client::{AutoMl, AutoMlConfig, ClientConfig, FitOptions, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::from_config(ClientConfig::from_env()?)?;
//!
//!     let mut automl = AutoMl::new(session, AutoMlConfig::new("MlRole", "label"));
//!     let job = automl
//!         .fit("s3://bucket/train.csv", FitOptions::default())
//!         .await?;
//!
//!     println!("Finished AutoML job: {}", job.name());
//!     Ok(())
//! }
//! ```

pub mod automl;
pub mod codec;
pub mod config;
pub mod error;
mod http;
pub mod images;
pub mod job;
pub mod logs;
pub mod monitor;
pub mod naming;
pub mod polling;
pub mod predictor;
pub mod processing;
pub mod s3;
pub mod schedule;
pub mod session;

// Re-export commonly used types
pub use automl::{AutoMl, AutoMlConfig, AutoMlInput, CandidateFilter, DataInput, DeployOptions, FitOptions};
pub use codec::{Deserializer, NdArray, Payload, Serializer};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use http::PlatformClient;
pub use job::JobHandle;
pub use logs::{InMemoryLogSink, LogSink, TracingLogSink};
pub use monitor::{
    Analyzer, BaselineOptions, ModelMonitor, MonitorConfig, ScheduleOptions, ScheduleUpdate,
};
pub use polling::{RetryConfig, WaitOptions};
pub use predictor::{DataCapture, PredictOptions, Predictor};
pub use processing::{
    ProcessingInput, ProcessingOutput, Processor, ProcessorConfig, RunOptions, ScriptProcessor,
};
pub use s3::S3Uri;
pub use schedule::ScheduleHandle;
pub use session::{BlobStore, ControlPlane, InferenceRuntime, InvokeRequest, InvokeResponse, Session};

pub use mlplane_core::domain::description::Description;
pub use mlplane_core::domain::job::{JobKind, JobStatus};
