// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fallback: answer a failed operation with a substitute value.
//!
//! A [`Fallback`] runs an operation and returns its value. When the operation fails the
//! error is absorbed and replaced, either by a clone of a constant
//! ([`value`][FallbackBuilder::value]) or by the result of a function of the error
//! ([`with`][FallbackBuilder::with]). [`Fallback::execute`] therefore returns `T`, not a
//! `Result`.
//!
//! Fallback is usually the outermost policy of a pipeline, where it also absorbs the
//! rejections of the policies it wraps.
//!
//! # Quick Start
//!
//! ```rust
//! use bulwark::fallback::Fallback;
//!
//! let fallback = Fallback::builder("recommendations")
//!     .with(|error: std::io::Error, _| vec![format!("unavailable: {}", error.kind())])
//!     .build();
//!
//! let items = fallback.execute(|| Err(std::io::Error::from(std::io::ErrorKind::NotFound)));
//!
//! assert_eq!(items, vec!["unavailable: entity not found".to_string()]);
//! assert_eq!(fallback.stats().fallback_used, 1);
//! ```
//!
//! # Failing Fallbacks
//!
//! A failure of the fallback itself is fatal to the call: it is never retried or replaced.
//! A fallback function that panics is not handled, and the panic propagates to the caller.
//! A fallback that can fail without panicking uses a `Result` as its value type. Its error
//! is then returned to the caller unchanged:
//!
//! ```rust
//! use bulwark::fallback::Fallback;
//!
//! let fallback = Fallback::builder("config_source")
//!     .with(|_primary: String, _| Err::<u16, _>("secondary source unavailable".to_string()))
//!     .build();
//!
//! let port = fallback.execute(|| Err("primary source unavailable".to_string()));
//!
//! assert_eq!(port, Err("secondary source unavailable".to_string()));
//! ```
//!
//! # Telemetry
//!
//! Every substitution emits the `bulwark.fallback` log event at `WARN` and a
//! `resilience.event` metric with event name `fallback`.

mod args;
mod builder;
mod callbacks;
mod service;

pub use args::FallbackArgs;
pub use builder::FallbackBuilder;
pub use service::{Fallback, FallbackStats};
