//! The retry loop.
//!
//! Semantics:
//! - `retries` counts total attempts (initial try + retries).
//! - `Outcome::Success` and `Outcome::Bail` stop immediately without waiting; the bail result is
//!   returned verbatim.
//! - `Outcome::Retry(e)` waits `min * factor^(attempt - 1)` and tries again, unless this was
//!   attempt `retries`, in which case `Err(e)` is returned.
//! - The notify callback runs once per wait, before sleeping, so exhaustion produces exactly
//!   `retries - 1` notifications.
//!
//! Invariants:
//! - Attempts never exceed `retries`.
//! - The tuning lock is only held while computing a wait, never across the operation, the
//!   notify callback or the sleep.
//! - Caller errors are not wrapped, logged or dropped (except intermediate ones, which only the
//!   notify callback sees).

use std::future::Future;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::outcome::Outcome;

impl Backoff {
    /// Run `operation` until it succeeds, bails, or the attempt budget is spent.
    ///
    /// Returns the success value, the bail result, or the last retryable error.
    pub async fn run<T, E, Op, Fut>(&self, operation: Op) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        self.run_with_notify(operation, |_, _, _| {}).await
    }

    /// Like [`Backoff::run`], calling `notify(attempt, wait, &err)` before each wait.
    pub async fn run_with_notify<T, E, Op, Fut, N>(
        &self,
        mut operation: Op,
        mut notify: N,
    ) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
        N: FnMut(usize, Duration, &E),
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Outcome::Success(value) => return Ok(value),
                Outcome::Bail(result) => return result,
                Outcome::Retry(err) => err,
            };

            if attempt >= self.retries {
                return Err(err);
            }

            let wait = self.state.next_wait(attempt);
            tracing::debug!(
                attempt,
                retries = self.retries,
                wait_ms = wait.as_secs_f64() * 1000.0,
                "backoff: attempt failed, waiting before retry"
            );
            notify(attempt, wait, &err);
            drop(err);

            self.sleeper.sleep(wait).await;
            attempt += 1;
        }
    }
}
