//! Bounded retries.
//!
//! [`RetryableAction`] runs an operation until it succeeds or the policy's
//! attempt budget (or total timeout) is spent. Each attempt leaves one log
//! record, and the outcome leaves one terminal record.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::host::Sleeper;
use crate::log::{RunLog, Severity};
use crate::verdict::Failure;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Doubles after every failure, capped at 16x the base delay.
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
    timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Fixed-delay policy. `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidPolicy(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
            timeout: None,
        })
    }

    /// A single try.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            timeout: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stop retrying once this much time has passed since the first attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 1u32 << attempt.saturating_sub(1).min(4);
                self.delay * factor
            }
        }
    }

    fn fixed(max_attempts: u32, delay_secs: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_secs(delay_secs),
            backoff: Backoff::Fixed,
            timeout: None,
        }
    }
}

/// Retry budgets for the default stages.
///
/// DNS gets the longest budget: a fresh host often has no resolver for the
/// first minutes after boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicies {
    pub dns: RetryPolicy,
    pub packages: RetryPolicy,
    pub installer_latest: RetryPolicy,
    pub installer_pinned: RetryPolicy,
    pub checkout: RetryPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            dns: RetryPolicy::fixed(150, 2),
            packages: RetryPolicy::fixed(10, 15),
            installer_latest: RetryPolicy::fixed(10, 10),
            installer_pinned: RetryPolicy::fixed(10, 10),
            checkout: RetryPolicy::fixed(10, 30),
        }
    }
}

/// A fallible operation wrapped in a retry policy.
pub struct RetryableAction<'a> {
    tag: String,
    label: String,
    policy: RetryPolicy,
    sleeper: &'a dyn Sleeper,
    exhausted_severity: Severity,
}

impl<'a> RetryableAction<'a> {
    /// `tag` is used for log records and, until [`label`](Self::label) is
    /// called, for messages too.
    pub fn new(tag: impl Into<String>, policy: RetryPolicy, sleeper: &'a dyn Sleeper) -> Self {
        let tag = tag.into();
        Self {
            label: tag.clone(),
            tag,
            policy,
            sleeper,
            exhausted_severity: Severity::Error,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Severity of the terminal record when attempts run out.
    pub fn exhausted_severity(mut self, severity: Severity) -> Self {
        self.exhausted_severity = severity;
        self
    }

    /// Run `op` until it succeeds or the policy is spent.
    ///
    /// `op` receives the 1-based attempt number. On exhaustion the returned
    /// failure carries the last error untouched.
    pub fn run<T, F>(&self, log: &mut RunLog, mut op: F) -> std::result::Result<T, Failure>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max = self.policy.max_attempts;
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op(attempt) {
                Ok(value) => {
                    log.info(
                        &self.tag,
                        format!("{}: attempt {}/{} succeeded", self.label, attempt, max),
                    );
                    log.info(
                        &self.tag,
                        format!("{} succeeded after {} attempt(s)", self.label, attempt),
                    );
                    return Ok(value);
                }
                Err(err) => err,
            };

            let out_of_time = self
                .policy
                .timeout
                .is_some_and(|limit| started.elapsed() >= limit);

            if attempt >= max || out_of_time {
                log.warn(
                    &self.tag,
                    format!("{}: attempt {}/{} failed: {}", self.label, attempt, max, err),
                );
                let summary = if attempt < max {
                    format!(
                        "{} gave up after {} attempt(s): timeout of {:?} reached",
                        self.label,
                        attempt,
                        self.policy.timeout.unwrap_or_default()
                    )
                } else {
                    format!("{} failed after {} attempt(s)", self.label, attempt)
                };
                log.append(self.exhausted_severity, &self.tag, summary);
                return Err(Failure::new(
                    format!("{} exhausted its retries", self.label),
                    Error::Exhausted {
                        action: self.label.clone(),
                        attempts: attempt,
                        source: Box::new(err),
                    },
                ));
            }

            let delay = self.policy.delay_after(attempt);
            log.warn(
                &self.tag,
                format!(
                    "{}: attempt {}/{} failed: {}; retrying in {:?}",
                    self.label, attempt, max, err, delay
                ),
            );
            self.sleeper.sleep(delay);
        }
    }
}
