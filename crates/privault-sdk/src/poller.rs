//! Polling of asynchronous de-identification runs.
//!
//! The wait between polls starts at one unit and doubles after every poll.
//! The total time slept never exceeds the configured maximum: the last wait
//! is shortened to fit, one final poll is made, and a run still in progress
//! is returned as such so the caller can resume later.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::DeidentifyFileResponse;

/// Upper bound accepted for a poller's maximum wait.
pub const MAX_WAIT: Duration = Duration::from_secs(64);

/// Default first wait between polls.
pub const DEFAULT_POLL_UNIT: Duration = Duration::from_secs(1);

/// Looks up the current state of a run.
#[async_trait]
pub trait RunFetcher: Send + Sync {
    /// Fetches the run.
    async fn fetch_run(&self, run_id: &str) -> Result<DeidentifyFileResponse>;
}

/// Polls a run until it finishes or the wait budget is spent.
#[derive(Debug, Clone, Copy)]
pub struct JobPoller {
    unit: Duration,
    max_wait: Duration,
}

impl JobPoller {
    /// Creates a poller that waits at most `max_wait` in total.
    ///
    /// `max_wait` must be positive and at most [`MAX_WAIT`].
    pub fn new(max_wait: Duration) -> Result<Self> {
        if max_wait.is_zero() || max_wait > MAX_WAIT {
            return Err(Error::validation(format!(
                "wait time must be greater than 0 and at most {} seconds",
                MAX_WAIT.as_secs()
            )));
        }
        Ok(Self {
            unit: DEFAULT_POLL_UNIT,
            max_wait,
        })
    }

    /// Sets the first wait between polls.
    #[must_use]
    pub fn with_unit(mut self, unit: Duration) -> Self {
        if !unit.is_zero() {
            self.unit = unit;
        }
        self
    }

    /// Total wait budget.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Polls `run_id` until it is terminal or the budget is spent.
    ///
    /// Lookup failures end polling immediately.
    #[instrument(skip(self, fetcher), fields(max_wait_ms = self.max_wait.as_millis()))]
    pub async fn poll<F>(&self, fetcher: &F, run_id: &str) -> Result<DeidentifyFileResponse>
    where
        F: RunFetcher + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        let mut interval = self.unit;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let mut run = fetcher.fetch_run(run_id).await?;

            if run.status.is_terminal() {
                debug!(attempt, status = %run.status, "Run finished");
                if run.run_id.is_empty() {
                    run.run_id = run_id.to_string();
                }
                return Ok(run);
            }

            if elapsed >= self.max_wait {
                debug!(attempt, "Wait budget spent, returning run in progress");
                if run.run_id.is_empty() {
                    run.run_id = run_id.to_string();
                }
                return Ok(run);
            }

            let wait = interval.min(self.max_wait - elapsed);
            debug!(attempt, wait_ms = wait.as_millis(), "Run in progress");
            tokio::time::sleep(wait).await;
            elapsed += wait;
            interval = interval.saturating_mul(2);
        }
    }
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            unit: DEFAULT_POLL_UNIT,
            max_wait: MAX_WAIT,
        }
    }
}
