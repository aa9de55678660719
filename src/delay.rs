//! Exponential delay model.
//!
//! Delays grow geometrically from `min` to `max` over the retry budget. With `retries` total
//! attempts the factor is `(max / min)^(1 / (retries - 1))`, so the wait scheduled after attempt
//! `a` (1-indexed) is `min * factor^(a - 1)`: attempt 1 waits exactly `min` and attempt `retries`
//! lands on `max`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use autobackoff::DelayModel;
//!
//! let model = DelayModel::new(5, Duration::from_millis(100), Duration::from_secs(1)).unwrap();
//! assert_eq!(model.wait(1), Duration::from_millis(100));
//! assert!((model.factor() - 1.7783).abs() < 1e-4);
//! ```
//!
//! `min` is the live value and may be moved by auto-tune; `original_min` is fixed at
//! construction. The factor is recomputed on every change to `min`.

use std::time::Duration;

use crate::error::BackoffError;

/// Largest accepted `max` delay (1 day). Computed waits saturate here.
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Pure exponential delay computation over a fixed retry budget.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayModel {
    retries: usize,
    original_min: f64,
    min: f64,
    max: f64,
    factor: f64,
}

impl DelayModel {
    /// Validate the bounds and compute the initial factor.
    pub fn new(retries: usize, min: Duration, max: Duration) -> Result<Self, BackoffError> {
        if retries < 2 {
            return Err(BackoffError::TooFewRetries(retries));
        }
        if min.is_zero() {
            return Err(BackoffError::MinMustBePositive);
        }
        if max < min {
            return Err(BackoffError::MaxLessThanMin { min, max });
        }
        if max > MAX_BACKOFF {
            return Err(BackoffError::MaxTooLarge(max));
        }
        let min = min.as_secs_f64();
        let mut model =
            Self { retries, original_min: min, min, max: max.as_secs_f64(), factor: 1.0 };
        model.calculate_factor();
        Ok(model)
    }

    fn calculate_factor(&mut self) {
        self.factor = (self.max / self.min).powf(1.0 / (self.retries - 1) as f64);
    }

    /// Total attempts before giving up.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Ratio between consecutive waits.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Live minimum delay.
    pub fn min(&self) -> Duration {
        secs_to_duration(self.min)
    }

    /// Minimum delay supplied at construction.
    pub fn original_min(&self) -> Duration {
        secs_to_duration(self.original_min)
    }

    /// Maximum delay.
    pub fn max(&self) -> Duration {
        secs_to_duration(self.max)
    }

    /// Wait after attempt `attempt` (1-indexed; `0` is treated as `1`), clamped to `max`.
    pub fn wait(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as f64;
        let secs = self.min * self.factor.powf(exponent);
        secs_to_duration(secs.min(self.max))
    }

    /// Move the live minimum, keeping it within `(0, max]`, and recompute the factor.
    ///
    /// Non-finite or non-positive values are ignored.
    pub fn set_min(&mut self, min: Duration) {
        let secs = min.as_secs_f64();
        if !(secs.is_finite() && secs > 0.0) {
            return;
        }
        self.min = secs.min(self.max);
        self.calculate_factor();
    }

    /// Put the live minimum back to the configured baseline.
    pub fn restore(&mut self) {
        self.min = self.original_min;
        self.calculate_factor();
    }
}

/// Convert float seconds into a `Duration`, mapping NaN/negative to zero and saturating at
/// [`MAX_BACKOFF`].
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}
