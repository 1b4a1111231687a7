// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Well-known telemetry keys and event names.
//!
//! When logs or metrics are enabled on a [`PolicyContext`][crate::PolicyContext], every
//! event emitted by a policy carries the three attributes below. Metrics are reported on the
//! `resilience.event` counter of the `bulwark` meter; log events are emitted through
//! `tracing` with the names `bulwark.breaker`, `bulwark.bulkhead`, `bulwark.timeout`,
//! `bulwark.retry` and `bulwark.fallback`.
//!
//! Keys are dot-separated and follow the
//! [OpenTelemetry naming guidelines](https://opentelemetry.io/docs/specs/semconv/general/naming/#general-naming-considerations).

/// Key used to annotate the name of the pipeline a policy belongs to.
///
/// Examples: `user_auth`, `inventory`, `payment_flow`.
pub const PIPELINE_NAME: &str = "resilience.pipeline.name";

/// Key used to annotate the name of an individual policy.
///
/// Examples: `inventory_breaker`, `db_bulkhead`.
pub const STRATEGY_NAME: &str = "resilience.strategy.name";

/// Key used to annotate the specific resilience event being emitted.
///
/// Examples: `circuit_opened`, `bulkhead_rejected`, `retry`.
pub const EVENT_NAME: &str = "resilience.event.name";

/// Circuit breaker entered the open state.
pub const CIRCUIT_OPENED: &str = "circuit_opened";

/// Circuit breaker entered the half-open state.
pub const CIRCUIT_HALF_OPENED: &str = "circuit_half_opened";

/// Circuit breaker entered the closed state.
pub const CIRCUIT_CLOSED: &str = "circuit_closed";

/// Circuit breaker rejected a call.
pub const CIRCUIT_REJECTED: &str = "circuit_rejected";

/// Bulkhead rejected a call because it was full, or evicted a queued caller.
pub const BULKHEAD_REJECTED: &str = "bulkhead_rejected";

/// A queued bulkhead caller gave up after its maximum wait.
pub const BULKHEAD_WAIT_TIMEOUT: &str = "bulkhead_wait_timeout";

/// An operation took longer than its timeout budget.
pub const TIMEOUT: &str = "timeout";

/// A failed attempt is about to be retried, or retries were exhausted.
pub const RETRY: &str = "retry";

/// A fallback replaced a failed operation's result.
pub const FALLBACK: &str = "fallback";
