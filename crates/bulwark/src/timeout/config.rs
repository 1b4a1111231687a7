// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

pub(super) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a [`Timeout`][super::Timeout] reports a call that overran its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum TimeoutMode {
    /// The operation's own result is returned. The overrun is only visible in statistics,
    /// logs and metrics.
    #[default]
    Advisory,

    /// A late result is discarded and replaced by
    /// [`PolicyError::OperationTimeout`][crate::PolicyError::OperationTimeout].
    Strict,
}

impl TimeoutMode {
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(dead_code, reason = "only used for telemetry")
    )]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Advisory => "advisory",
            Self::Strict => "strict",
        }
    }
}

/// Configuration of a [`Timeout`][super::Timeout].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct TimeoutConfig {
    /// The time budget of a single call.
    #[cfg_attr(any(feature = "serde", test), serde(with = "crate::serde_duration"))]
    pub timeout: Duration,

    /// How an overrun is reported.
    pub mode: TimeoutMode,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            mode: TimeoutMode::Advisory,
        }
    }
}

impl TimeoutConfig {
    /// Creates a configuration with the given budget and the default mode.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Sets the reporting mode.
    #[must_use]
    pub fn mode(self, mode: TimeoutMode) -> Self {
        Self { mode, ..self }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TimeoutConfig::default();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.mode, TimeoutMode::Advisory);
        assert_eq!(TimeoutConfig::new(Duration::from_millis(50)).mode(TimeoutMode::Strict).mode, TimeoutMode::Strict);
    }

    #[test]
    fn deserialize_partial() {
        let config: TimeoutConfig = serde_json::from_str(r#"{"timeout":"250ms","mode":"strict"}"#).unwrap();
        assert_eq!(config, TimeoutConfig::new(Duration::from_millis(250)).mode(TimeoutMode::Strict));

        let config: TimeoutConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TimeoutConfig::default());
    }
}
