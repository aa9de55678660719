//! Shared tuning state and the auto-tune controller.
//!
//! Every `Backoff` owns one [`TuningState`] behind a single mutex. Retry callers lock it to read
//! the next wait and, when auto-tune is on, to record that wait as a sample. The controller task
//! locks it at the end of each phase:
//!
//! ```text
//!   ┌──────── poll elapsed: min = mean(samples), samples drained ────────┐
//!   │                                                                    ▼
//! POLL                                                                RESET
//!   ▲                                                                    │
//!   └──────────── reset elapsed: min = original_min ─────────────────────┘
//! ```
//!
//! Either phase ends early when shutdown is signalled. The lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use crate::delay::{secs_to_duration, DelayModel};

/// Running sum of waits handed out since the last recalculation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct WaitSamples {
    count: u64,
    accumulated: f64,
}

impl WaitSamples {
    pub(crate) fn record(&mut self, wait: Duration) {
        self.count += 1;
        self.accumulated += wait.as_secs_f64();
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the recorded waits, clearing the accumulator. `None` when empty.
    pub(crate) fn drain_mean(&mut self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let mean = self.accumulated / self.count as f64;
        *self = Self::default();
        Some(secs_to_duration(mean))
    }
}

/// Delay model plus the optional sample accumulator.
#[derive(Debug)]
pub(crate) struct TuningState {
    pub(crate) delay: DelayModel,
    pub(crate) samples: Option<WaitSamples>,
}

/// Handle to the state shared by retry callers and the controller.
#[derive(Debug, Clone)]
pub(crate) struct SharedState {
    inner: Arc<Mutex<TuningState>>,
}

impl SharedState {
    pub(crate) fn new(delay: DelayModel) -> Self {
        Self { inner: Arc::new(Mutex::new(TuningState { delay, samples: None })) }
    }

    // Every critical section leaves the numbers consistent, so a poisoned lock is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TuningState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Wait for `attempt`, recorded as a sample if auto-tune is on.
    pub(crate) fn next_wait(&self, attempt: usize) -> Duration {
        let mut state = self.lock();
        let wait = state.delay.wait(attempt);
        if let Some(samples) = state.samples.as_mut() {
            samples.record(wait);
        }
        wait
    }

    /// End of POLL: adopt the observed mean as the new minimum.
    fn adjust_to_observed(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(samples) = state.samples.as_mut() else {
            return;
        };
        let count = samples.count();
        if let Some(mean) = samples.drain_mean() {
            state.delay.set_min(mean);
            tracing::info!(
                samples = count,
                min_ms = state.delay.min().as_secs_f64() * 1000.0,
                factor = state.delay.factor(),
                "auto-tune: min delay moved to observed mean"
            );
        } else {
            tracing::debug!("auto-tune: no waits observed, min unchanged");
        }
    }

    /// End of RESET: return to the configured minimum.
    fn restore(&self) {
        let mut state = self.lock();
        state.delay.restore();
        tracing::info!(
            min_ms = state.delay.min().as_secs_f64() * 1000.0,
            "auto-tune: min delay restored"
        );
    }
}

/// Intervals driving the auto-tune cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutoTuneConfig {
    /// How long samples are gathered before `min` is recalculated.
    pub poll: Duration,
    /// How long the recalculated `min` stays in effect before it is restored.
    pub reset: Duration,
}

impl AutoTuneConfig {
    pub fn new(poll: Duration, reset: Duration) -> Self {
        Self { poll, reset }
    }

    pub(crate) fn validate(&self) -> Result<(), crate::BackoffError> {
        if self.poll.is_zero() {
            return Err(crate::BackoffError::IntervalMustBePositive { name: "poll" });
        }
        if self.reset.is_zero() {
            return Err(crate::BackoffError::IntervalMustBePositive { name: "reset" });
        }
        Ok(())
    }
}

/// Completion of the controller task. Clones resolve together once the task has exited.
pub(crate) type ControllerExit = Shared<BoxFuture<'static, ()>>;

/// Running controller task and the means to stop it.
pub(crate) struct Controller {
    shutdown: watch::Sender<bool>,
    exited: ControllerExit,
}

impl Controller {
    /// Spawn the controller on `runtime`.
    pub(crate) fn spawn(
        runtime: &tokio::runtime::Handle,
        state: SharedState,
        config: AutoTuneConfig,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let task = runtime.spawn(control_loop(state, config, rx));
        let exited = async move {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "auto-tune controller did not exit cleanly");
            }
        }
        .boxed()
        .shared();
        Self { shutdown, exited }
    }

    /// Ask the task to stop without waiting for it.
    pub(crate) fn signal(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signal shutdown and hand back the exit future. Every caller awaits the same exit.
    pub(crate) fn stop(&self) -> ControllerExit {
        self.signal();
        self.exited.clone()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("stopping", &*self.shutdown.borrow())
            .field("exited", &self.exited.peek().is_some())
            .finish()
    }
}

async fn control_loop(
    state: SharedState,
    config: AutoTuneConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(poll = ?config.poll, reset = ?config.reset, "auto-tune controller started");
    loop {
        if !phase(config.poll, &mut shutdown).await {
            break;
        }
        state.adjust_to_observed();

        if !phase(config.reset, &mut shutdown).await {
            break;
        }
        state.restore();
    }
    tracing::debug!("auto-tune controller stopped");
}

/// Sleep for `duration` unless shutdown arrives first. Returns `false` on shutdown.
async fn phase(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        biased;
        // A closed channel means the owning Backoff is gone.
        _ = shutdown.changed() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
