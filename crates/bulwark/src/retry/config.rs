// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Configuration of a [`Retry`][super::Retry] policy.
///
/// Which errors are worth retrying is not part of the configuration; it is set with
/// [`RetryBuilder::retry_if`][super::RetryBuilder::retry_if].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct RetryConfig {
    /// Retries after the first attempt. The operation runs at most `max_retries + 1` times.
    pub max_retries: u32,

    /// Delay before the first retry.
    #[cfg_attr(any(feature = "serde", test), serde(with = "crate::serde_duration"))]
    pub initial_delay: Duration,

    /// Factor applied to the delay after every retry. Negative values count as zero.
    pub backoff_multiplier: f64,

    /// Upper bound of any single delay.
    #[cfg_attr(any(feature = "serde", test), serde(with = "crate::serde_duration"))]
    pub max_delay: Duration,

    /// Spreads each delay uniformly over `[0.75, 1.25]` times its nominal value.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            use_jitter: false,
        }
    }
}

impl RetryConfig {
    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub fn max_retries(self, max_retries: u32) -> Self {
        Self { max_retries, ..self }
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn initial_delay(self, initial_delay: Duration) -> Self {
        Self { initial_delay, ..self }
    }

    /// Sets the factor applied to the delay after every retry.
    #[must_use]
    pub fn backoff_multiplier(self, backoff_multiplier: f64) -> Self {
        Self {
            backoff_multiplier,
            ..self
        }
    }

    /// Sets the upper bound of any single delay.
    #[must_use]
    pub fn max_delay(self, max_delay: Duration) -> Self {
        Self { max_delay, ..self }
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn use_jitter(self, use_jitter: bool) -> Self {
        Self { use_jitter, ..self }
    }
}
