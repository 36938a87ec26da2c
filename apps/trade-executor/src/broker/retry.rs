//! Retry policy with exponential backoff for broker calls.
//!
//! Only [`BrokerError::is_transient`] failures are retried: transport
//! errors, timeouts, rate limits and 408/5xx responses. Rejections,
//! authentication failures and insufficient funds end the submission.
//!
//! The calculator caps the number of retries, not the number of attempts:
//! `max_attempts = 5` allows one initial send plus up to four retries.

use std::time::Duration;

use rand::Rng;

use crate::application::ports::BrokerError;

/// How hard the coordinator tries to get one order to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerRetryPolicy {
    /// Sends allowed per order, the first included.
    pub max_attempts: u32,
    /// Delay before the first resend.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth per resend.
    pub backoff_multiplier: f64,
    /// Relative spread applied to each delay (0.2 is ±20%).
    pub jitter_factor: f64,
}

impl Default for BrokerRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl BrokerRetryPolicy {
    /// Policy without sleeps, for simulations and tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Per-submission backoff state.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    policy: BrokerRetryPolicy,
    attempts_made: u32,
}

impl ExponentialBackoffCalculator {
    /// Create a calculator; the first attempt is counted as made.
    #[must_use]
    pub fn new(policy: &BrokerRetryPolicy) -> Self {
        Self {
            policy: policy.clone(),
            attempts_made: 1,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempts_made >= self.policy.max_attempts {
            return None;
        }
        let exponent = i32::try_from(self.attempts_made - 1).unwrap_or(i32::MAX);
        let base = self
            .policy
            .initial_backoff
            .mul_f64(self.policy.backoff_multiplier.powi(exponent).min(1e6))
            .min(self.policy.max_backoff);
        self.attempts_made += 1;
        Some(self.jittered(base).min(self.policy.max_backoff))
    }

    /// Delay before retrying after `error`: `None` for fatal errors or when
    /// attempts are exhausted. A broker-supplied `Retry-After` wins over the
    /// computed backoff, capped at the policy maximum.
    pub fn delay_for(&mut self, error: &BrokerError) -> Option<Duration> {
        if !error.is_transient() {
            return None;
        }
        let computed = self.next_backoff()?;
        match error {
            BrokerError::RateLimited {
                retry_after: Some(after),
            } => Some((*after).min(self.policy.max_backoff).max(computed)),
            _ => Some(computed),
        }
    }

    /// Uniform jitter in `[base * (1 - j), base * (1 + j)]`.
    fn jittered(&self, base: Duration) -> Duration {
        let jitter = self.policy.jitter_factor;
        if jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let factor = rand::rng().random_range((1.0 - jitter).max(0.0)..=1.0 + jitter);
        base.mul_f64(factor)
    }

    /// Attempts made so far, including the first.
    #[must_use]
    pub const fn attempts_made(&self) -> u32 {
        self.attempts_made
    }
}

/// Check if an HTTP status code is retryable.
#[must_use]
pub fn is_retryable_status(status_code: u16) -> bool {
    matches!(status_code, 408 | 429) || (500..600).contains(&status_code)
}
