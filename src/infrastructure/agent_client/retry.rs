use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::errors::ControllerError;

/// Exponential-backoff retry wrapper for outbound agent HTTP calls, spec.md
/// §4.1: "transient classes ... are retried with exponential backoff (base
/// 1 s, cap 10 s, ≤ 3 attempts); HTTP status errors and semantic failures are
/// *not* retried." Grounded on `infrastructure/claude/retry.rs`'s
/// `RetryPolicy`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(multiplier)
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    /// Runs `operation` up to `max_retries + 1` times, retrying only on
    /// errors where `is_retriable` returns true. The last error (retriable or
    /// not) is returned if every attempt fails.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ControllerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ControllerError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() && attempt < self.max_retries => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "retrying agent call");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                // Retries are exhausted on a transport failure: spec.md §4.1
                // classifies that as agent unavailability, not a one-off error.
                Err(err) if err.is_retriable() => return Err(err.into_agent_unavailable()),
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 1_000, 10_000);
        assert_eq!(policy.calculate_backoff(0).as_millis(), 1_000);
        assert_eq!(policy.calculate_backoff(1).as_millis(), 2_000);
        assert_eq!(policy.calculate_backoff(2).as_millis(), 4_000);
        assert_eq!(policy.calculate_backoff(10).as_millis(), 10_000);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, 1, 2);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = policy
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(ControllerError::AgentUnavailable("connect failed".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let policy = RetryPolicy::new(3, 1, 2);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result: Result<(), ControllerError> = policy
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ControllerError::AgentJobError {
                        message: "bad topology".into(),
                        stdout: None,
                        stderr: None,
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_on_a_transport_error_surfaces_agent_unavailable() {
        let policy = RetryPolicy::new(2, 1, 2);
        let result: Result<(), ControllerError> = policy
            .execute(|| async { Err(ControllerError::NetworkTimeout("timed out".into())) })
            .await;
        assert!(matches!(result, Err(ControllerError::AgentUnavailable(_))));
    }

    #[tokio::test]
    async fn exhausting_retries_on_connection_refused_also_surfaces_agent_unavailable() {
        let policy = RetryPolicy::new(1, 1, 2);
        let result: Result<(), ControllerError> = policy
            .execute(|| async { Err(ControllerError::ConnectionRefused("refused".into())) })
            .await;
        assert!(matches!(result, Err(ControllerError::AgentUnavailable(_))));
    }
}
