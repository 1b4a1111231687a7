// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Time budgets for blocking operations.
//!
//! [`Timeout`] runs an operation to completion on the caller's thread, measures how long it
//! took, and classifies the call afterwards. A running operation is never interrupted: a
//! blocking call has no hook through which it could be cancelled. Detection is post-hoc.
//!
//! Operations that can check a budget themselves use
//! [`execute_with_deadline`][Timeout::execute_with_deadline], which hands them a
//! [`Deadline`] to consult between steps.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bulwark::timeout::{Timeout, TimeoutMode};
//!
//! let timeout = Timeout::builder("db_query")
//!     .timeout(Duration::from_millis(500))
//!     .mode(TimeoutMode::Strict)
//!     .build();
//!
//! let rows = timeout.execute(|| Ok::<_, std::io::Error>(vec![1, 2, 3]))?;
//!
//! assert_eq!(rows.len(), 3);
//! assert_eq!(timeout.stats().successful_operations, 1);
//! # Ok::<(), bulwark::Error<std::io::Error>>(())
//! ```
//!
//! # Defaults
//!
//! | Parameter | Default Value | Configured By |
//! |-----------|---------------|---------------|
//! | `timeout` | 30 seconds | [`TimeoutBuilder::timeout`] |
//! | `mode` | [`TimeoutMode::Advisory`] | [`TimeoutBuilder::mode`] |
//!
//! # Classification
//!
//! A call whose elapsed time is strictly greater than the budget is timed out, even when it
//! failed. Otherwise it is successful or failed according to its result. The statistics are
//! updated for every completed call, including timed-out ones. A panicking operation is
//! recorded as failed, or as timed out when it overran, before the panic continues.
//!
//! # Telemetry
//!
//! A timed-out call emits the `bulwark.timeout` log event at `WARN` and a `resilience.event`
//! metric with event name `timeout`.

mod builder;
mod config;
mod deadline;
mod service;

pub use builder::TimeoutBuilder;
pub use config::{TimeoutConfig, TimeoutMode};
pub use deadline::Deadline;
pub use service::{Timeout, TimeoutStats};
