//! Bounded replay of whole transactions on concurrency conflicts.
//!
//! A unit of work is replayed from the start, in a fresh transaction, so the
//! document number and every movement stay atomic together. Business-rule
//! failures are returned on the first attempt.

use async_trait::async_trait;
use std::time::Duration;
use stockledger_shared::LedgerConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{LedgerStore, LedgerTx};

/// How conflict-class failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Never less than 1.
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `base_backoff * n`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for RetryPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt)
    }
}

/// Work that runs inside one ledger transaction and may be replayed.
///
/// `run` must not have side effects outside `tx`.
#[async_trait]
pub trait UnitOfWork<T: LedgerTx>: Sync {
    /// Value produced by a successful run.
    type Output: Send;

    /// Runs the work against an open transaction.
    async fn run(&self, tx: &mut T) -> LedgerResult<Self::Output>;
}

/// Runs `work` in a transaction, committing on success and rolling back on
/// failure. Conflicts replay the whole transaction up to
/// `policy.max_attempts` times.
///
/// # Errors
///
/// The first non-retryable error, or `RetriesExhausted` once conflicts have
/// used every attempt.
pub async fn run_in_transaction<S, W>(
    store: &S,
    policy: &RetryPolicy,
    work: &W,
) -> LedgerResult<W::Output>
where
    S: LedgerStore,
    W: UnitOfWork<S::Tx> + ?Sized,
{
    let mut attempt: u32 = 1;
    loop {
        match attempt_once(store, work).await {
            Err(err) if err.is_retryable() => {
                if attempt >= policy.max_attempts {
                    warn!(
                        attempts = attempt,
                        error = %err,
                        "transaction conflicts exhausted retries"
                    );
                    return Err(LedgerError::RetriesExhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                let delay = policy.backoff(attempt);
                warn!(attempt, ?delay, error = %err, "transaction conflict, retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Ok(output) => {
                if attempt > 1 {
                    debug!(attempts = attempt, "transaction committed after retry");
                }
                return Ok(output);
            }
            Err(err) => return Err(err),
        }
    }
}

async fn attempt_once<S, W>(store: &S, work: &W) -> LedgerResult<W::Output>
where
    S: LedgerStore,
    W: UnitOfWork<S::Tx> + ?Sized,
{
    let mut tx = store.begin().await?;
    match work.run(&mut tx).await {
        Ok(output) => {
            tx.commit().await?;
            Ok(output)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryLedgerStore, MemoryTx};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a conflict until `succeed_on` is reached.
    struct Flaky {
        calls: AtomicU32,
        succeed_on: u32,
    }

    #[async_trait]
    impl UnitOfWork<MemoryTx> for Flaky {
        type Output = u32;

        async fn run(&self, _tx: &mut MemoryTx) -> LedgerResult<u32> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < self.succeed_on {
                return Err(LedgerError::ConcurrencyConflict("position".into()));
            }
            Ok(call)
        }
    }

    struct AlwaysInvalid {
        calls: AtomicU32,
    }

    #[async_trait]
    impl UnitOfWork<MemoryTx> for AlwaysInvalid {
        type Output = ();

        async fn run(&self, _tx: &mut MemoryTx) -> LedgerResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::invalid("bad line"))
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&LedgerConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff(2), Duration::from_millis(50));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_conflict_is_retried_until_success() {
        let store = MemoryLedgerStore::new();
        let work = Flaky {
            calls: AtomicU32::new(0),
            succeed_on: 3,
        };
        let result = run_in_transaction(&store, &fast(3), &work).await.unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let store = MemoryLedgerStore::new();
        let work = Flaky {
            calls: AtomicU32::new(0),
            succeed_on: 10,
        };
        let err = run_in_transaction(&store, &fast(3), &work).await.unwrap_err();
        assert!(matches!(err, LedgerError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(work.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let store = MemoryLedgerStore::new();
        let work = AlwaysInvalid {
            calls: AtomicU32::new(0),
        };
        let err = run_in_transaction(&store, &fast(5), &work).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMovementIntent(_)));
        assert_eq!(work.calls.load(Ordering::SeqCst), 1);
    }
}
