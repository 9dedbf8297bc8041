//! Polling and retry utilities
//!
//! [`Poller`] paces the describe loop of a handle and enforces the caller's
//! optional timeout and cancellation token. [`RetryConfig`] drives the
//! exponential backoff the HTTP transport applies to idempotent calls; the
//! poller itself never retries.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Optional bounds on a wait
///
/// The default waits until a terminal status is observed, however long that takes.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout: Option<Duration>,
    /// Give up as soon as this token is cancelled
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// State of one wait loop
#[derive(Debug)]
pub struct Poller {
    name: String,
    interval: Duration,
    options: WaitOptions,
    started: Instant,
    polls: u32,
}

impl Poller {
    /// Creates a poller for the resource called `name`
    pub fn new(name: impl Into<String>, interval: Duration, options: WaitOptions) -> Self {
        Self {
            name: name.into(),
            interval,
            options,
            started: Instant::now(),
            polls: 0,
        }
    }

    /// Number of completed ticks
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleeps until the next poll is due
    ///
    /// The sleep is shortened so that one last poll happens at the deadline.
    /// Fails with `WaitTimedOut` once the deadline has passed and with
    /// `WaitCancelled` as soon as the token fires.
    pub async fn tick(&mut self) -> Result<()> {
        self.check()?;

        let delay = match self.options.timeout {
            Some(timeout) => self.interval.min(timeout.saturating_sub(self.elapsed())),
            None => self.interval,
        };

        match &self.options.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        return Err(ClientError::WaitCancelled { name: self.name.clone() });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        self.polls += 1;
        debug!(name = %self.name, polls = self.polls, "Polling");
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if let Some(token) = &self.options.cancel
            && token.is_cancelled()
        {
            return Err(ClientError::WaitCancelled {
                name: self.name.clone(),
            });
        }

        if let Some(timeout) = self.options.timeout
            && self.elapsed() >= timeout
        {
            return Err(ClientError::WaitTimedOut {
                name: self.name.clone(),
                waited: self.elapsed(),
            });
        }

        Ok(())
    }
}

/// Retry policy for transient transport failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Maximum exponent (2^max_exponent multiplier)
    pub max_exponent: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            max_exponent: 4,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Backoff before retry number `retry` (1-based)
    ///
    /// Formula: `min(base * 2^min(retry-1, max_exponent), max_delay)`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(self.max_exponent);
        let multiplier = 2u32.saturating_pow(exponent);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// Only errors for which [`ClientError::is_retryable`] holds are retried.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        "Transient failure, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_until_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            max_exponent: 4,
        };

        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(4), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_permanent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = RetryConfig::new(5)
            .run("Describe", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::api_error(400, "bad request"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_server_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = RetryConfig::new(3)
            .run("Describe", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ClientError::api_error(503, "unavailable"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_times_out() {
        let mut poller = Poller::new(
            "job-1",
            Duration::from_secs(5),
            WaitOptions::new().with_timeout(Duration::from_secs(12)),
        );

        assert!(poller.tick().await.is_ok());
        assert!(poller.tick().await.is_ok());
        // third sleep is shortened to hit the deadline exactly
        assert!(poller.tick().await.is_ok());

        let err = poller.tick().await.unwrap_err();
        assert!(matches!(err, ClientError::WaitTimedOut { ref name, .. } if name == "job-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_cancelled_mid_sleep() {
        let token = CancellationToken::new();
        let mut poller = Poller::new(
            "job-1",
            Duration::from_secs(60),
            WaitOptions::new().with_cancellation(token.clone()),
        );

        let canceller = token.clone();
        let (result, _) = tokio::join!(poller.tick(), async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        assert!(matches!(result, Err(ClientError::WaitCancelled { .. })));
    }
}
