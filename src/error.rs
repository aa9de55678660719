//! Error types for backoff construction and lifecycle.
//!
//! These cover programmer errors only. Errors produced by the operation being retried are never
//! wrapped: `Backoff::run` hands them back to the caller exactly as they were returned.
use std::time::Duration;

/// Configuration and lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackoffError {
    /// The delay factor divides by `retries - 1`, so at least two attempts are required.
    #[error("retries must be >= 2 (got {0})")]
    TooFewRetries(usize),
    /// The minimum delay must be non-zero.
    #[error("min delay must be greater than zero")]
    MinMustBePositive,
    /// The maximum delay must not be smaller than the minimum.
    #[error("max ({max:?}) must be >= min ({min:?})")]
    MaxLessThanMin {
        /// Minimum supplied by the caller.
        min: Duration,
        /// Maximum supplied by the caller.
        max: Duration,
    },
    /// The maximum delay exceeds [`crate::MAX_BACKOFF`] (1 day).
    #[error("max ({0:?}) must not exceed the 1 day cap")]
    MaxTooLarge(Duration),
    /// Auto-tune poll and reset intervals must be non-zero.
    #[error("auto-tune {name} interval must be greater than zero")]
    IntervalMustBePositive {
        /// Which interval was rejected (`"poll"` or `"reset"`).
        name: &'static str,
    },
    /// Auto-tune can be enabled at most once per instance.
    #[error("auto-tune is already enabled for this backoff")]
    AutoTuneAlreadyEnabled,
    /// Auto-tune spawns a background task and needs a tokio runtime.
    #[error("auto-tune requires a running tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_retries_display() {
        let msg = BackoffError::TooFewRetries(1).to_string();
        assert!(msg.contains(">= 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn max_less_than_min_display_includes_both_bounds() {
        let err = BackoffError::MaxLessThanMin {
            min: Duration::from_millis(500),
            max: Duration::from_millis(100),
        };
        let msg = err.to_string();
        assert!(msg.contains("500ms"));
        assert!(msg.contains("100ms"));
    }

    #[test]
    fn max_too_large_mentions_cap() {
        let msg = BackoffError::MaxTooLarge(Duration::from_secs(90_000)).to_string();
        assert!(msg.contains("1 day"));
        assert!(msg.contains("90000s"));
    }

    #[test]
    fn interval_display_names_the_interval() {
        let msg = BackoffError::IntervalMustBePositive { name: "reset" }.to_string();
        assert!(msg.contains("reset"));
    }
}
