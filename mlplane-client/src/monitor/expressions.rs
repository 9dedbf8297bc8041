//! Schedule expressions and dataset formats understood by the analyzer

use serde_json::{Value, json};

use crate::error::{ClientError, Result};

/// Cron expressions accepted by monitoring schedules
pub struct CronExpression;

impl CronExpression {
    /// Every hour, on the hour
    pub fn hourly() -> String {
        "cron(0 * ? * * *)".to_string()
    }

    /// Once a day at `hour` UTC
    pub fn daily(hour: u32) -> Result<String> {
        check_hour(hour)?;
        Ok(format!("cron(0 {hour} ? * * *)"))
    }

    /// Every `interval` hours starting at `starting_hour` UTC
    pub fn daily_every_x_hours(interval: u32, starting_hour: u32) -> Result<String> {
        check_hour(starting_hour)?;
        if !(1..=23).contains(&interval) {
            return Err(ClientError::validation(format!(
                "Hour interval must be between 1 and 23, got {interval}"
            )));
        }
        Ok(format!("cron(0 {starting_hour}/{interval} ? * * *)"))
    }
}

fn check_hour(hour: u32) -> Result<()> {
    if hour > 23 {
        return Err(ClientError::validation(format!(
            "Hour must be between 0 and 23, got {hour}"
        )));
    }
    Ok(())
}

/// Format of the dataset handed to the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv { header: bool },
    Json { lines: bool },
    /// Records captured from an endpoint
    SagemakerCaptureJson,
}

impl DatasetFormat {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Csv { header } => {
                json!({"csv": {"header": header, "output_columns_position": "START"}})
            }
            Self::Json { lines } => json!({"json": {"lines": lines}}),
            Self::SagemakerCaptureJson => json!({
                "sagemakerCaptureJson": {
                    "captureIndexNames": ["endpointInput", "endpointOutput"]
                }
            }),
        }
    }

    /// The value of the analyzer's `dataset_format` environment variable
    pub fn to_env_value(&self) -> String {
        self.to_value().to_string()
    }
}
