// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Composable fault-tolerance policies for fallible, blocking operations.
//!
//! This crate wraps calls to an unreliable dependency (a database, a remote service, a
//! socket) with protective behavior. Each policy decides, for every call, whether the call
//! proceeds, blocks, is rejected, is retried, or is substituted:
//!
//! - [`breaker`]: fails fast while a dependency is unhealthy.
//! - [`bulkhead`]: bounds how many calls run against a dependency at once.
//! - [`timeout`]: bounds how long a caller is willing to wait, measured after the fact.
//! - [`retry`]: re-attempts transient failures with exponential backoff.
//! - [`fallback`]: substitutes a safe value when everything else failed.
//!
//! # Execution Model
//!
//! Every policy executes the wrapped operation synchronously, on the caller's own thread.
//! There is no worker pool or event loop. A single policy instance is `Send + Sync` and is
//! meant to be shared by many threads, either by reference or behind an `Arc`.
//!
//! An operation is any zero-argument closure returning `Result<T, E>`. Because every policy
//! accepts the same shape of closure, policies nest by wrapping one `execute` call in another.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bulwark::breaker::CircuitBreaker;
//! use bulwark::bulkhead::Bulkhead;
//! use bulwark::fallback::Fallback;
//! use bulwark::retry::Retry;
//! use bulwark::{Error, PolicyContext};
//!
//! let context = PolicyContext::default().name("inventory");
//!
//! let breaker = CircuitBreaker::builder("inventory_breaker")
//!     .context(&context)
//!     .failure_threshold(3)
//!     .build();
//! let bulkhead = Bulkhead::builder("inventory_bulkhead")
//!     .context(&context)
//!     .max_concurrent(8)
//!     .build();
//! let retry = Retry::builder("inventory_retry")
//!     .context(&context)
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(1))
//!     // Rejections from the breaker and bulkhead are not worth retrying.
//!     .retry_if(|error: &Error<String>, _| !error.is_policy())
//!     .build();
//! let fallback = Fallback::builder("inventory_fallback")
//!     .context(&context)
//!     .value(0_u32)
//!     .build();
//!
//! let stock = fallback.execute(|| {
//!     retry.execute(|| {
//!         breaker
//!             .execute(|| bulkhead.execute(|| lookup_stock("sku-42")))
//!             .map_err(Error::flatten)
//!     })
//! });
//!
//! assert_eq!(stock, 7);
//! # fn lookup_stock(_sku: &str) -> Result<u32, String> { Ok(7) }
//! ```
//!
//! The order of nesting changes behavior. In the example above the bulkhead sits inside the
//! retry, so every retry attempt acquires a fresh concurrency slot and is individually counted
//! by the circuit breaker.
//!
//! # Errors
//!
//! Policies report their own decisions through [`PolicyError`]: a rejection by an open circuit
//! or a full bulkhead, an expired bulkhead wait, or an operation that overran its time budget.
//! Operation errors pass through unchanged inside [`Error::Operation`]. Nesting two policies
//! produces `Error<Error<E>>`, which [`Error::flatten`] collapses back into `Error<E>`.
//!
//! # Time
//!
//! Policies read time and sleep through a [`Clock`] shared via [`PolicyContext`]. Production
//! code uses the system clock. With the `test-util` feature, `ClockControl` lets tests move
//! time forward manually so that breaker timeouts and retry backoff do not slow tests down.
//!
//! # Features
//!
//! - `logs`: emits structured [`tracing`](https://docs.rs/tracing) events for state changes,
//!   rejections, retries, timeouts and fallbacks. Enable per pipeline with
//!   [`PolicyContext::enable_logs`].
//! - `metrics`: reports the OpenTelemetry `resilience.event` counter. Enable per pipeline with
//!   [`PolicyContext::enable_metrics`].
//! - `serde`: serialization of the configuration types. Durations use the friendly format
//!   (`"250ms"`, `"5s"`).
//! - `test-util`: exposes `ClockControl` for deterministic time in tests.

mod clock;
pub use clock::{Clock, Stopwatch};

#[cfg(any(feature = "test-util", test))]
mod clock_control;
#[cfg(any(feature = "test-util", test))]
pub use clock_control::ClockControl;

mod context;
pub use context::PolicyContext;

mod error;
pub use error::{Error, PolicyError};

mod shared;
pub use shared::{NotSet, Set};

pub(crate) mod utils;

#[cfg(any(feature = "metrics", test))]
mod metrics;

#[cfg(any(feature = "serde", test))]
mod serde_duration;

pub mod telemetry;

pub mod breaker;
pub mod bulkhead;
pub mod fallback;
pub mod retry;
pub mod timeout;

mod rnd;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
