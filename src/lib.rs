#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # autobackoff
//!
//! Exponential retry/backoff for async Rust whose minimum delay can tune itself from the waits
//! it actually hands out.
//!
//! ## Features
//!
//! - **Bounded exponential schedule**: `retries` attempts, waits growing from `min` to `max`
//! - **Bail out** of a retry sequence from inside the operation
//! - **Auto-tune**: a background task periodically moves `min` to the observed mean wait, then
//!   restores it
//! - **Clean shutdown**: `close` joins the background task
//! - **Tower layer** for wrapping services
//!
//! ## Quick Start
//!
//! ```rust
//! use autobackoff::{Backoff, Outcome};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backoff = Backoff::new(5, Duration::from_millis(100), Duration::from_secs(1)).unwrap();
//!
//!     let result = backoff
//!         .run_with_notify(
//!             || async {
//!                 // Your fallible operation here
//!                 Outcome::<_, std::io::Error>::Success("ok")
//!             },
//!             |attempt, wait, err| eprintln!("attempt {attempt} failed ({err}), waiting {wait:?}"),
//!         )
//!         .await;
//!     assert_eq!(result.unwrap(), "ok");
//!
//!     backoff.close().await;
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod delay;
pub mod error;
pub mod layer;
pub mod outcome;
pub mod prelude;
pub mod retry;
pub mod sleeper;
pub mod tune;

// Re-exports
pub use backoff::{Backoff, BackoffBuilder, DelaySnapshot};
pub use config::BackoffConfig;
pub use delay::{DelayModel, MAX_BACKOFF};
pub use error::BackoffError;
pub use layer::{BackoffLayer, BackoffService};
pub use outcome::Outcome;
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use tune::AutoTuneConfig;
