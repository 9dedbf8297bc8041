//! Job handle and wait loop
//!
//! A [`JobHandle`] names one submitted job and caches the description it
//! fetched last. The platform is the source of truth: every `describe`
//! replaces the cache wholesale, and `wait` only ever reads remote state.

use std::sync::Arc;
use tracing::{debug, info};

use mlplane_core::domain::description::Description;
use mlplane_core::domain::job::{JobKind, JobStatus};

use crate::error::{ClientError, Result};
use crate::logs::{LogSink, TracingLogSink};
use crate::polling::{Poller, WaitOptions};
use crate::session::Session;

/// Handle to a submitted one-shot job
#[derive(Clone)]
pub struct JobHandle {
    session: Session,
    kind: JobKind,
    name: String,
    last_description: Option<Description>,
    log_sink: Arc<dyn LogSink>,
}

impl JobHandle {
    /// Creates a handle for an already submitted job
    pub fn new(session: Session, kind: JobKind, name: impl Into<String>) -> Self {
        Self {
            session,
            kind,
            name: name.into(),
            last_description: None,
            log_sink: Arc::new(TracingLogSink),
        }
    }

    /// Sends job logs fetched by `wait(true)` to `sink`
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Description fetched by the last `describe`, if any
    pub fn last_description(&self) -> Option<&Description> {
        self.last_description.as_ref()
    }

    /// Fetches the job's current description
    ///
    /// Always goes to the platform and replaces the cached description.
    pub async fn describe(&mut self) -> Result<Description> {
        let description = self
            .session
            .control()
            .describe_job(self.kind, &self.name)
            .await?;
        self.last_description = Some(description.clone());
        Ok(description)
    }

    /// Fetches the job's current status
    pub async fn status(&mut self) -> Result<JobStatus> {
        let description = self.describe().await?;
        job_status(self.kind, &description)
    }

    /// Waits until the job reaches a terminal status
    ///
    /// # Arguments
    /// * `logs` - Stream the job's log lines to the handle's log sink while waiting
    ///
    /// # Returns
    /// The description carrying the terminal status. A `Failed` job is
    /// returned like any other terminal job.
    ///
    /// There is no timeout: this waits as long as the job runs. Use
    /// [`JobHandle::wait_with`] to bound the wait.
    pub async fn wait(&mut self, logs: bool) -> Result<Description> {
        self.wait_with(logs, WaitOptions::default()).await
    }

    /// Waits until the job reaches a terminal status, a timeout elapses or a
    /// cancellation token fires
    ///
    /// With `logs` enabled, new log lines are drained after every describe so
    /// the lines written up to the terminal status are all delivered before
    /// this returns.
    pub async fn wait_with(&mut self, logs: bool, options: WaitOptions) -> Result<Description> {
        let mut poller = Poller::new(&self.name, self.session.config().poll_interval, options);
        let mut tail = logs.then(LogTail::default);

        info!(job = %self.name, kind = %self.kind, logs, "Waiting for job");

        loop {
            let description = self.describe().await?;
            let status = job_status(self.kind, &description)?;

            if let Some(tail) = tail.as_mut() {
                tail.drain(self).await?;
            }

            if status.is_terminal() {
                info!(
                    job = %self.name,
                    %status,
                    polls = poller.polls(),
                    "Job reached terminal status"
                );
                return Ok(description);
            }

            debug!(job = %self.name, %status, "Job still running");
            poller.tick().await?;
        }
    }

    /// Requests the job to stop
    ///
    /// Returns as soon as the request is accepted; observe the resulting
    /// `Stopped` status with `describe` or `wait`.
    pub async fn stop(&self) -> Result<()> {
        info!(job = %self.name, kind = %self.kind, "Stopping job");
        self.session.control().stop_job(self.kind, &self.name).await
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("last_description", &self.last_description)
            .finish_non_exhaustive()
    }
}

/// Reads the status field of a job description
pub fn job_status(kind: JobKind, description: &Description) -> Result<JobStatus> {
    let raw = description.str_at(kind.status_key()).ok_or_else(|| {
        ClientError::ParseError(format!(
            "Description is missing {}",
            kind.status_key()
        ))
    })?;
    raw.parse().map_err(ClientError::ParseError)
}

/// Cursor over a job's log output
#[derive(Debug, Default)]
struct LogTail {
    cursor: Option<String>,
}

impl LogTail {
    /// Delivers every log line available so far
    async fn drain(&mut self, job: &JobHandle) -> Result<usize> {
        let mut delivered = 0;

        loop {
            let page = job
                .session
                .control()
                .job_logs(job.kind, &job.name, self.cursor.as_deref())
                .await?;

            for entry in &page.events {
                job.log_sink.write(&job.name, entry);
            }
            delivered += page.events.len();

            let advanced = page.next_token.is_some() && page.next_token != self.cursor;
            if page.next_token.is_some() {
                self.cursor = page.next_token;
            }

            if page.events.is_empty() || !advanced {
                return Ok(delivered);
            }
        }
    }
}
