//! Job log types

use serde::{Deserialize, Serialize};

/// A log line emitted by a remote job's container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Stream the line came from (one per container instance)
    pub log_stream_name: String,
    pub message: String,
}

/// One page of job log lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogPage {
    #[serde(default)]
    pub events: Vec<LogEntry>,
    /// Cursor to pass to the next fetch; unchanged when no new lines exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}
