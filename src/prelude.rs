//! Convenient re-exports for common autobackoff types.
pub use crate::{
    backoff::{Backoff, BackoffBuilder, DelaySnapshot},
    config::BackoffConfig,
    delay::MAX_BACKOFF,
    error::BackoffError,
    layer::BackoffLayer,
    outcome::Outcome,
    tune::AutoTuneConfig,
};
