//! The backoff instance: configuration, shared tuning state and auto-tune lifecycle.
//!
//! Lifecycle:
//! - build once with fixed `(retries, min, max)`;
//! - optionally enable auto-tune once, which spawns the controller task;
//! - call `run` any number of times, from any number of tasks (share it behind an `Arc`);
//! - `close`: signals the controller and waits for it to exit. Calling it again returns once
//!   the controller is gone; without auto-tune it is a no-op. In-flight `run` calls are not cancelled.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use autobackoff::{Backoff, Outcome};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backoff = Backoff::new(5, Duration::from_millis(100), Duration::from_secs(1)).unwrap();
//! backoff.auto_tune(Duration::from_secs(30), Duration::from_secs(120)).unwrap();
//!
//! let result: Result<u32, std::io::Error> = backoff.run(|| async { Outcome::Success(7) }).await;
//! assert_eq!(result.unwrap(), 7);
//!
//! backoff.close().await;
//! # });
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::BackoffConfig;
use crate::delay::DelayModel;
use crate::error::BackoffError;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::tune::{AutoTuneConfig, Controller, SharedState, WaitSamples};

/// Exponential backoff with an optional self-tuning minimum delay.
#[derive(Debug)]
pub struct Backoff {
    pub(crate) retries: usize,
    pub(crate) state: SharedState,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    controller: Mutex<Option<Controller>>,
}

/// Point-in-time view of the delay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySnapshot {
    pub retries: usize,
    pub original_min: Duration,
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Backoff {
    /// Create a backoff with auto-tune disabled and the tokio sleeper.
    ///
    /// # Errors
    /// `retries < 2`, a zero `min`, `max < min`, or `max` above [`crate::MAX_BACKOFF`].
    pub fn new(retries: usize, min: Duration, max: Duration) -> Result<Self, BackoffError> {
        Self::builder().retries(retries).min(min).max(max).build()
    }

    /// Start a builder from [`BackoffConfig::default`].
    pub fn builder() -> BackoffBuilder {
        BackoffBuilder::new()
    }

    /// Build from a config, starting auto-tune if the config asks for it.
    pub fn from_config(config: BackoffConfig) -> Result<Self, BackoffError> {
        BackoffBuilder::from_config(config).build()
    }

    fn with_model(model: DelayModel, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            retries: model.retries(),
            state: SharedState::new(model),
            sleeper,
            controller: Mutex::new(None),
        }
    }

    /// Enable auto-tune: every `poll`, `min` moves to the mean of the waits handed out since the
    /// last adjustment; `reset` later it returns to the configured value. Repeats until `close`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Zero intervals, no runtime, or auto-tune already enabled on this instance.
    pub fn auto_tune(&self, poll: Duration, reset: Duration) -> Result<(), BackoffError> {
        let config = AutoTuneConfig::new(poll, reset);
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BackoffError::NoRuntime)?;

        // Held until the controller is stored, so `close` never sees auto-tune half enabled.
        let mut slot = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state.lock();
            if state.samples.is_some() {
                return Err(BackoffError::AutoTuneAlreadyEnabled);
            }
            state.samples = Some(WaitSamples::default());
        }

        *slot = Some(Controller::spawn(&runtime, self.state.clone(), config));
        Ok(())
    }

    /// Whether auto-tune was enabled on this instance (it stays reported after `close`).
    pub fn is_auto_tuning(&self) -> bool {
        self.state.lock().samples.is_some()
    }

    /// Stop the auto-tune controller and wait for it to exit.
    ///
    /// Concurrent callers all wait for the same exit.
    pub async fn close(&self) {
        let exited = {
            let slot = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
            slot.as_ref().map(Controller::stop)
        };
        if let Some(exited) = exited {
            exited.await;
        }
    }

    /// Total attempts made before giving up.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Wait that would currently follow a failed `attempt`. Does not record a sample.
    pub fn wait_for(&self, attempt: usize) -> Duration {
        self.state.lock().delay.wait(attempt)
    }

    /// Current delay parameters, read under the lock.
    pub fn snapshot(&self) -> DelaySnapshot {
        let state = self.state.lock();
        DelaySnapshot {
            retries: state.delay.retries(),
            original_min: state.delay.original_min(),
            min: state.delay.min(),
            max: state.delay.max(),
            factor: state.delay.factor(),
        }
    }
}

impl Drop for Backoff {
    fn drop(&mut self) {
        // Can't join here; the task exits on its own once signalled.
        let slot = self.controller.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(controller) = slot {
            controller.signal();
        }
    }
}

/// Builder for [`Backoff`].
#[derive(Debug, Clone)]
pub struct BackoffBuilder {
    config: BackoffConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl BackoffBuilder {
    pub fn new() -> Self {
        Self::from_config(BackoffConfig::default())
    }

    pub fn from_config(config: BackoffConfig) -> Self {
        Self { config, sleeper: Arc::new(TokioSleeper) }
    }

    /// Total attempts (initial + retries). Must be >= 2.
    pub fn retries(mut self, retries: usize) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn min(mut self, min: Duration) -> Self {
        self.config.min = min;
        self
    }

    pub fn max(mut self, max: Duration) -> Self {
        self.config.max = max;
        self
    }

    /// Enable auto-tune as part of `build`.
    pub fn auto_tune(mut self, poll: Duration, reset: Duration) -> Self {
        self.config.auto_tune = Some(AutoTuneConfig::new(poll, reset));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Validate and build. Starting auto-tune needs a tokio runtime.
    pub fn build(self) -> Result<Backoff, BackoffError> {
        let model = DelayModel::new(self.config.retries, self.config.min, self.config.max)?;
        let backoff = Backoff::with_model(model, self.sleeper);
        if let Some(tune) = self.config.auto_tune {
            backoff.auto_tune(tune.poll, tune.reset)?;
        }
        Ok(backoff)
    }
}

impl Default for BackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}
