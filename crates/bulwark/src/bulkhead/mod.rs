// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bulkhead: bound how many calls run against a dependency at once.
//!
//! A [`Bulkhead`] owns `max_concurrent` slots. A call that finds a free slot runs right
//! away. Otherwise the [`RejectionPolicy`] decides:
//!
//! - [`FailFast`][RejectionPolicy::FailFast] rejects the call with
//!   [`PolicyError::BulkheadFull`][crate::PolicyError::BulkheadFull] without blocking.
//! - [`Wait`][RejectionPolicy::Wait] queues up to `max_waiting` callers on a condition
//!   variable. A queued caller gives up with
//!   [`PolicyError::WaitTimeout`][crate::PolicyError::WaitTimeout] after
//!   `max_wait_duration`, or waits without bound when that duration is zero. A caller
//!   arriving at a full queue is rejected.
//! - [`DiscardOldest`][RejectionPolicy::DiscardOldest] queues like `Wait`, but a caller
//!   arriving at a full queue evicts the caller that has waited the longest, which then fails
//!   with `BulkheadFull`. Without a queue (`max_waiting == 0`) it behaves like `FailFast`.
//!
//! A released slot wakes one queued caller. Queued callers are not served in FIFO order: a
//! woken caller competes for the slot with callers that just arrived.
//!
//! Wait bounds are measured in real time, independently of the
//! [`PolicyContext`][crate::PolicyContext] clock.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bulwark::bulkhead::{Bulkhead, RejectionPolicy};
//!
//! let bulkhead = Bulkhead::builder("db_pool")
//!     .max_concurrent(4)
//!     .max_waiting(16)
//!     .max_wait_duration(Duration::from_millis(250))
//!     .rejection_policy(RejectionPolicy::Wait)
//!     .build();
//!
//! let rows = bulkhead.execute(|| Ok::<_, std::io::Error>(42))?;
//!
//! assert_eq!(rows, 42);
//! assert_eq!(bulkhead.stats().current_concurrent, 0);
//! # Ok::<(), bulwark::Error<std::io::Error>>(())
//! ```
//!
//! # Defaults
//!
//! | Parameter | Default Value | Configured By |
//! |-----------|---------------|---------------|
//! | `max_concurrent` | 10 | [`BulkheadBuilder::max_concurrent`] |
//! | `max_waiting` | 0 | [`BulkheadBuilder::max_waiting`] |
//! | `max_wait_duration` | zero (unbounded) | [`BulkheadBuilder::max_wait_duration`] |
//! | `rejection_policy` | [`RejectionPolicy::FailFast`] | [`BulkheadBuilder::rejection_policy`] |
//!
//! # Telemetry
//!
//! Rejections and evictions emit the `bulwark.bulkhead` log event at `WARN` and the
//! `bulkhead_rejected` metric event. Expired waits emit `bulkhead_wait_timeout`.

mod builder;
mod config;
mod permit;
mod service;
mod state;

pub use builder::BulkheadBuilder;
pub use config::{BulkheadConfig, RejectionPolicy};
pub use permit::BulkheadPermit;
pub use service::Bulkhead;
pub use state::BulkheadStats;
