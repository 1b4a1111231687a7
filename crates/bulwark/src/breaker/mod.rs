// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaker: fail fast while a dependency is unhealthy.
//!
//! A [`CircuitBreaker`] counts consecutive failures of the calls it guards. Once the count
//! reaches the failure threshold the circuit *opens* and every call is rejected with
//! [`PolicyError::CircuitOpen`][crate::PolicyError::CircuitOpen] without running. After the
//! open timeout the circuit becomes *half-open* and admits a limited number of probe calls.
//! Enough consecutive probe successes close it again; any probe failure re-opens it.
//!
//! | From | Trigger | To |
//! |------|---------|----|
//! | Closed | consecutive failures reach `failure_threshold` | Open |
//! | Open | `open_timeout` elapsed since the last state change | Half-open |
//! | Half-open | consecutive successes reach `success_threshold` | Closed |
//! | Half-open | any failure | Open |
//!
//! The open-to-half-open move is lazy: it happens when the breaker is next consulted,
//! through [`allow_request`][CircuitBreaker::allow_request],
//! [`execute`][CircuitBreaker::execute], [`state`][CircuitBreaker::state] or
//! [`stats`][CircuitBreaker::stats].
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bulwark::breaker::{CircuitBreaker, CircuitState};
//! use bulwark::{Error, PolicyError};
//!
//! let breaker = CircuitBreaker::builder("payments")
//!     .failure_threshold(3)
//!     .open_timeout(Duration::from_secs(10))
//!     .build();
//!
//! for _ in 0..3 {
//!     let _ = breaker.execute(|| Err::<(), _>("connection refused"));
//! }
//!
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(matches!(
//!     breaker.execute(|| Ok::<_, &str>(())),
//!     Err(Error::Policy(PolicyError::CircuitOpen { .. }))
//! ));
//! ```
//!
//! # Manual Control
//!
//! Callers that do not run the operation through [`execute`][CircuitBreaker::execute] pair
//! [`allow_request`][CircuitBreaker::allow_request] with
//! [`record_success`][CircuitBreaker::record_success] or
//! [`record_failure`][CircuitBreaker::record_failure]. A dependency can be isolated with
//! [`force_open`][CircuitBreaker::force_open] and restored with
//! [`force_close`][CircuitBreaker::force_close].
//!
//! # Defaults
//!
//! | Parameter | Default Value | Configured By |
//! |-----------|---------------|---------------|
//! | `failure_threshold` | 5 | [`CircuitBreakerBuilder::failure_threshold`] |
//! | `success_threshold` | 2 | [`CircuitBreakerBuilder::success_threshold`] |
//! | `open_timeout` | 5 seconds | [`CircuitBreakerBuilder::open_timeout`] |
//! | `half_open_max_probes` | 1 | [`CircuitBreakerBuilder::half_open_max_probes`] |
//!
//! # Telemetry
//!
//! State changes emit the `bulwark.breaker` log event (openings at `WARN`, the others at
//! `INFO`) and the `circuit_opened`, `circuit_half_opened` and `circuit_closed` metric
//! events. Rejections emit `circuit_rejected`.

mod args;
mod builder;
mod callbacks;
mod config;
mod service;
mod state;

pub use args::TransitionArgs;
pub use builder::CircuitBreakerBuilder;
pub use config::BreakerConfig;
pub use service::CircuitBreaker;
pub use state::{BreakerStats, CircuitState};
