// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Retry: re-run transient failures with exponential backoff.
//!
//! A [`Retry`] policy runs an operation and, when it fails with an error the
//! [`retry_if`][RetryBuilder::retry_if] predicate considers retryable, sleeps and runs it
//! again. The operation runs at most `max_retries + 1` times. The error of the last attempt
//! is returned unchanged.
//!
//! The delay before retry `k` (0-based) is `min(initial_delay * backoff_multiplier^k,
//! max_delay)`. With jitter enabled each delay is drawn uniformly from `[0.75 * d, 1.25 * d]`
//! and capped at `max_delay` again. Delays are slept on the [`Clock`][crate::Clock] of the
//! policy's [`PolicyContext`][crate::PolicyContext], so tests using `ClockControl` do not
//! wait.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bulwark::retry::Retry;
//!
//! let retry = Retry::builder("flaky_io")
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(1))
//!     .retry_if(|error: &std::io::Error, _| error.kind() == std::io::ErrorKind::TimedOut)
//!     .build();
//!
//! let mut calls = 0;
//! let result = retry.execute_detailed(|| {
//!     calls += 1;
//!     if calls < 3 {
//!         Err(std::io::Error::from(std::io::ErrorKind::TimedOut))
//!     } else {
//!         Ok("payload")
//!     }
//! });
//!
//! assert_eq!(result.attempts, 3);
//! assert_eq!(result.into_result().unwrap(), "payload");
//! ```
//!
//! # Defaults
//!
//! | Parameter | Default Value | Configured By |
//! |-----------|---------------|---------------|
//! | `max_retries` | 3 | [`RetryBuilder::max_retries`] |
//! | `initial_delay` | 100 milliseconds | [`RetryBuilder::initial_delay`] |
//! | `backoff_multiplier` | 2.0 | [`RetryBuilder::backoff_multiplier`] |
//! | `max_delay` | 30 seconds | [`RetryBuilder::max_delay`] |
//! | `use_jitter` | `false` | [`RetryBuilder::use_jitter`] |
//! | retry predicate | every error | [`RetryBuilder::retry_if`] |
//!
//! # Telemetry
//!
//! Every failed attempt that is followed by a retry, and the final failed attempt, emit the
//! `bulwark.retry` log event at `WARN` and a `resilience.event` metric with event name
//! `retry`. Both carry the attempt index and whether it was the last one.

mod args;
mod attempt;
mod backoff;
mod builder;
mod callbacks;
mod config;
mod service;

pub use args::{OnRetryArgs, RetryArgs};
pub use attempt::Attempt;
pub use builder::RetryBuilder;
pub use config::RetryConfig;
pub use service::{Retry, RetryResult, RetryStats};
