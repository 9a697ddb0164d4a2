use std::future::Future;
use std::time::Duration;
use log::warn;
use tokio_util::sync::CancellationToken;

use crate::app_config::{BackoffKind, RetryConfig};

// @module: Bounded retry with cancellable waits

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Base wait between two attempts
    pub delay: Duration,

    /// Growth of the wait
    pub backoff: BackoffKind,
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure
    Exhausted { attempts: u32, last_error: E },

    /// Cancellation was requested before an attempt or during a wait
    Cancelled,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
            backoff: BackoffKind::Fixed,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            backoff: config.backoff,
        }
    }

    /// Wait before the given attempt (1-based); the first attempt never waits
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            BackoffKind::Fixed => self.delay,
            BackoffKind::Exponential => {
                let exponent = (attempt - 2).min(16);
                self.delay.saturating_mul(1u32 << exponent)
            }
        }
    }

    /// Run `op` until it succeeds, the budget is spent or `cancel` fires
    ///
    /// `op` receives the 1-based attempt number. An attempt in flight is
    /// dropped as soon as `cancel` fires.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        label: &str,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let wait = self.delay_for(attempt);
            if !wait.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{} attempt {}/{} failed: {}", label, attempt, max_attempts, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last_error) => Err(RetryError::Exhausted {
                attempts: max_attempts,
                last_error,
            }),
            // The loop runs at least once, so a missing error means we were never allowed to try
            None => Err(RetryError::Cancelled),
        }
    }
}
