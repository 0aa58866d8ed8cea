//! Retry layer for flaky interactions

use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use streamprobe_common::config::RetryConfig;
use tracing::{debug, warn};

use crate::error::{E2eResult, ErrorKind};

/// Which failures to re-drive, how often, and how long to pause in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retryable: HashSet<ErrorKind>,
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Policy retrying timeouts and stale references. `max_attempts` is at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            retryable: [ErrorKind::Timeout, ErrorKind::StaleElement]
                .into_iter()
                .collect(),
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }

    /// Run once, never retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Replace the retryable set
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Invoke `op` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. The error returned is the last one observed.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> E2eResult<T>) -> E2eResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if self.is_retryable(e.kind()) && attempt < self.max_attempts => {
                    warn!(
                        "{} failed on attempt {}/{}: {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, self.delay
                    );
                    sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => {
                    if self.is_retryable(e.kind()) {
                        warn!("{} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
