//! Plain configuration for building a `Backoff`.
//!
//! With the `serde` feature enabled the types derive `Serialize`/`Deserialize`, so a backoff can
//! be described in whatever format the application already loads its settings from.

use std::time::Duration;

use crate::error::BackoffError;
use crate::tune::AutoTuneConfig;

/// Backoff bounds plus optional auto-tune intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BackoffConfig {
    /// Total attempts, including the first. Must be >= 2.
    pub retries: usize,
    /// Wait after the first failed attempt.
    pub min: Duration,
    /// Wait after attempt `retries`; the upper bound of the schedule.
    pub max: Duration,
    /// Start the auto-tune controller when the backoff is built.
    pub auto_tune: Option<AutoTuneConfig>,
}

impl Default for BackoffConfig {
    /// 5 attempts from 1s to 10s, auto-tune off.
    fn default() -> Self {
        Self {
            retries: 5,
            min: Duration::from_secs(1),
            max: Duration::from_secs(10),
            auto_tune: None,
        }
    }
}

impl BackoffConfig {
    /// Check everything that can be checked without a runtime.
    pub fn validate(&self) -> Result<(), BackoffError> {
        crate::delay::DelayModel::new(self.retries, self.min, self.max)?;
        if let Some(tune) = &self.auto_tune {
            tune.validate()?;
        }
        Ok(())
    }
}
