// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Configuration of a [`CircuitBreaker`][super::CircuitBreaker].
///
/// Thresholds and the probe limit are clamped to at least 1 when the breaker is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed circuit.
    pub failure_threshold: u32,

    /// Consecutive successes that close a half-open circuit.
    pub success_threshold: u32,

    /// How long an open circuit rejects calls before letting probes through.
    #[cfg_attr(any(feature = "serde", test), serde(with = "crate::serde_duration"))]
    pub open_timeout: Duration,

    /// Maximum number of probes admitted concurrently while half-open.
    pub half_open_max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(5),
            half_open_max_probes: 1,
        }
    }
}

impl BreakerConfig {
    /// Sets the number of consecutive failures that open the circuit.
    #[must_use]
    pub fn failure_threshold(self, failure_threshold: u32) -> Self {
        Self { failure_threshold, ..self }
    }

    /// Sets the number of consecutive half-open successes that close the circuit.
    #[must_use]
    pub fn success_threshold(self, success_threshold: u32) -> Self {
        Self { success_threshold, ..self }
    }

    /// Sets how long the circuit stays open.
    #[must_use]
    pub fn open_timeout(self, open_timeout: Duration) -> Self {
        Self { open_timeout, ..self }
    }

    /// Sets the number of concurrent half-open probes.
    #[must_use]
    pub fn half_open_max_probes(self, half_open_max_probes: u32) -> Self {
        Self {
            half_open_max_probes,
            ..self
        }
    }

    pub(super) fn normalized(self) -> Self {
        Self {
            failure_threshold: self.failure_threshold.max(1),
            success_threshold: self.success_threshold.max(1),
            open_timeout: self.open_timeout,
            half_open_max_probes: self.half_open_max_probes.max(1),
        }
    }
}
