//! # Bounded Polling
//!
//! Fixed-interval (optionally backed-off) polling with a hard ceiling. Every
//! provider wait in the pipeline goes through [`poll_until`], so a wait that
//! never converges surfaces as [`MigrationError::Timeout`] instead of
//! spinning forever.

use crate::error::{MigrationError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Interval, ceiling and backoff for one polling loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
    /// 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            backoff_multiplier: 1.0,
            max_interval: interval,
        }
    }

    /// Interval to sleep after the given one
    ///
    /// Never exceeds `max_interval` (or `interval` when that is larger), even
    /// for a multiplier that would overflow `Duration`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier <= 1.0 {
            return current;
        }
        let ceiling = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(ceiling, |next| next.min(ceiling))
    }
}

/// Result of one polling check
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Ready(T),
    Pending,
}

/// Tracks elapsed time and the current interval of one polling loop
///
/// For loops whose check needs mutable state, which a closure-based
/// [`poll_until`] cannot lend out between iterations.
#[derive(Debug)]
pub struct PollClock {
    policy: PollPolicy,
    started: Instant,
    interval: Duration,
    attempts: u32,
}

impl PollClock {
    pub fn new(policy: &PollPolicy) -> Self {
        Self {
            policy: policy.clone(),
            started: Instant::now(),
            interval: policy.interval,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sleep until the next check, or fail once the ceiling would be passed
    pub async fn tick(&mut self, operation: &str) -> Result<()> {
        self.attempts += 1;
        let waited = self.started.elapsed();
        if waited + self.interval > self.policy.max_wait {
            warn!(
                operation = %operation,
                attempts = self.attempts,
                waited_ms = waited.as_millis() as u64,
                "⏱️ Polling ceiling reached"
            );
            return Err(MigrationError::timeout(operation, waited));
        }

        tokio::time::sleep(self.interval).await;
        self.interval = self.policy.next_interval(self.interval);
        Ok(())
    }
}

/// Run `check` until it is ready, errors, or the policy's ceiling is hit
///
/// The check runs immediately on entry, so a condition that already holds
/// returns without sleeping.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, operation: &str, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>>>,
{
    let mut clock = PollClock::new(policy);

    loop {
        if let PollOutcome::Ready(value) = check().await? {
            debug!(
                operation = %operation,
                attempts = clock.attempts() + 1,
                "Polling condition satisfied"
            );
            return Ok(value);
        }
        clock.tick(operation).await?;
    }
}
