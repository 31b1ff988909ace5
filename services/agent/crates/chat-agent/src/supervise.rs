//! Restart loop for the transport connection.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::transport::TransportError;

/// Capped exponential backoff with a budget of consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub max_retries: u32,
}

impl RestartPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("connection failed {attempts} times in a row, giving up: {last}")]
    BudgetExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("connection failed permanently: {0}")]
    Fatal(#[source] TransportError),
}

/// One connection loop; returns `Ok` only on a requested shutdown.
#[async_trait]
pub trait Connection: Send {
    async fn run(&mut self) -> Result<(), TransportError>;
}

/// Runs `conn` until it returns `Ok`, restarting it after retryable errors.
///
/// A run that lasted longer than `policy.max` counts as recovered and
/// resets the failure streak.
///
/// # Errors
///
/// Returns [`RestartError::Fatal`] on a non-retryable error and
/// [`RestartError::BudgetExhausted`] after `max_retries` consecutive failures.
pub async fn run_with_restart<C: Connection>(
    conn: &mut C,
    policy: RestartPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), RestartError> {
    let mut failures = 0u32;
    loop {
        let started = Instant::now();
        let error = match conn.run().await {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        if !error.is_retryable() {
            tracing::error!(%error, "connection failed permanently");
            return Err(RestartError::Fatal(error));
        }
        if started.elapsed() > policy.max {
            failures = 0;
        }
        failures += 1;
        if failures > policy.max_retries {
            tracing::error!(%error, attempts = failures, "restart budget exhausted");
            return Err(RestartError::BudgetExhausted {
                attempts: failures,
                last: error,
            });
        }

        let delay = policy.delay(failures);
        tracing::warn!(
            %error,
            attempt = failures,
            max_retries = policy.max_retries,
            delay_secs = delay.as_secs(),
            "connection failed, restarting"
        );
        tokio::select! {
            () = time::sleep(delay) => {}
            () = crate::shutdown::requested(shutdown) => {
                tracing::info!("shutdown requested during backoff");
                return Ok(());
            }
        }
    }
}
