//! Job log sinks
//!
//! Log lines fetched while waiting on a job are handed to a [`LogSink`].
//! The default sink re-emits them as `tracing` events; the in-memory sink
//! collects them so callers (and tests) can inspect them afterwards.

use mlplane_core::domain::log::LogEntry;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Destination for job log lines
pub trait LogSink: Send + Sync {
    /// Delivers one log line
    ///
    /// # Arguments
    /// * `job_name` - Name of the job that produced the line
    /// * `entry` - The log line
    fn write(&self, job_name: &str, entry: &LogEntry);
}

/// Emits every log line as an `info` event on the `mlplane::job_logs` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, job_name: &str, entry: &LogEntry) {
        info!(
            target: "mlplane::job_logs",
            job = job_name,
            stream = %entry.log_stream_name,
            "{}",
            entry.message
        );
    }
}

/// In-memory log sink
///
/// Uses Arc<Mutex<Vec<LogEntry>>> so clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogSink {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryLogSink {
    /// Creates a new in-memory log sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all collected log lines
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.drain(..).collect()
    }

    /// Messages collected so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.iter().map(|e| e.message.clone()).collect()
    }
}

impl LogSink for InMemoryLogSink {
    fn write(&self, _job_name: &str, entry: &LogEntry) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push(entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            log_stream_name: "job/algo-1".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_in_memory_sink_collects_and_drains() {
        let sink = InMemoryLogSink::new();
        let shared = sink.clone();

        sink.write("job", &entry("first"));
        shared.write("job", &entry("second"));

        assert_eq!(sink.messages(), vec!["first", "second"]);
        assert_eq!(sink.drain().len(), 2);
        assert!(shared.drain().is_empty());
    }
}
